use crate::enums::Trend;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The value cell of a dashboard card.
///
/// Counts and plain numbers travel as JSON numbers; currency and percentage
/// values are pre-formatted strings such as `"$100.00"` or `"45.50%"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayValue {
    Count(i64),
    Number(#[serde(with = "rust_decimal::serde::float")] Decimal),
    Text(String),
}

/// One card of the dashboard. `icon` and `color` are opaque tags for the
/// client-side renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub title: String,
    pub value: DisplayValue,
    pub change: String,
    pub trend: Trend,
    pub icon: String,
    pub color: String,
}
