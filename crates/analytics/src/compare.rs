use crate::error::AnalyticsError;
use crate::present::round2;
use core_types::Trend;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the delta between two period values is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaMode {
    /// Percentage change relative to the prior value.
    Relative,
    /// Plain difference. Used for metrics that already are percentages and
    /// for small counts.
    Absolute,
}

/// Current vs prior value of one metric.
///
/// `delta` is rounded to two decimals and `trend` is taken from the rounded
/// value, so a change too small to display is `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub current: Decimal,
    pub prior: Decimal,
    pub delta: Decimal,
    pub trend: Trend,
}

impl Comparison {
    fn new(current: Decimal, prior: Decimal, raw_delta: Decimal) -> Self {
        let delta = round2(raw_delta);
        Self { current, prior, delta, trend: trend_of(delta) }
    }
}

/// Percentage change from `prior` to `current`.
///
/// A zero prior never divides: the delta is 0 when both are zero and a flat
/// +100 otherwise.
pub fn compare(current: Decimal, prior: Decimal) -> Result<Comparison, AnalyticsError> {
    let delta = if prior.is_zero() {
        if current.is_zero() { Decimal::ZERO } else { Decimal::ONE_HUNDRED }
    } else {
        current
            .checked_sub(prior)
            .and_then(|diff| diff.checked_div(prior))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| AnalyticsError::Overflow(format!("relative change from {prior} to {current}")))?
    };
    Ok(Comparison::new(current, prior, delta))
}

/// Absolute change from `prior` to `current`.
pub fn compare_absolute(current: Decimal, prior: Decimal) -> Result<Comparison, AnalyticsError> {
    let delta = current
        .checked_sub(prior)
        .ok_or_else(|| AnalyticsError::Overflow(format!("change from {prior} to {current}")))?;
    Ok(Comparison::new(current, prior, delta))
}

pub fn compare_with(mode: DeltaMode, current: Decimal, prior: Decimal) -> Result<Comparison, AnalyticsError> {
    match mode {
        DeltaMode::Relative => compare(current, prior),
        DeltaMode::Absolute => compare_absolute(current, prior),
    }
}

/// Exactly zero is `Neutral`.
pub fn trend_of(delta: Decimal) -> Trend {
    if delta > Decimal::ZERO {
        Trend::Up
    } else if delta < Decimal::ZERO {
        Trend::Down
    } else {
        Trend::Neutral
    }
}
