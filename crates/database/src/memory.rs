//! In-memory `DataStore` for tests and demos.

use crate::error::DbError;
use crate::query::{Entity, FetchQuery, Filter, FilterOp, FilterValue, Row};
use crate::store::DataStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Holds rows per entity and applies the same filter semantics as `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Entity, Vec<Row>>>,
    failure: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw rows. Rows are not validated, so malformed data can be staged.
    pub async fn insert_rows(&self, entity: Entity, rows: impl IntoIterator<Item = Row>) {
        self.tables.write().await.entry(entity).or_default().extend(rows);
    }

    /// Serializes `records` into rows of `entity`.
    pub async fn insert<T: Serialize>(&self, entity: Entity, records: &[T]) -> Result<(), DbError> {
        let rows = records
            .iter()
            .map(|record| match serde_json::to_value(record)? {
                Value::Object(row) => Ok(row),
                other => Err(DbError::Unavailable(format!("{entity} rows must be objects, got {other}"))),
            })
            .collect::<Result<Vec<Row>, DbError>>()?;
        self.insert_rows(entity, rows).await;
        Ok(())
    }

    /// Makes every subsequent `fetch` and `ping` fail with `message`.
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.failure.write().await = message.map(str::to_string);
    }

    async fn check_failure(&self) -> Result<(), DbError> {
        match self.failure.read().await.as_ref() {
            Some(message) => Err(DbError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Row>, DbError> {
        self.check_failure().await?;
        query.validate()?;
        let columns = query.selected_columns()?;

        let tables = self.tables.read().await;
        let rows = tables.get(&query.entity).map(Vec::as_slice).unwrap_or_default();

        Ok(rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
            .filter(|row| query.any_of.is_empty() || query.any_of.iter().any(|f| matches_filter(row, f)))
            .map(|row| {
                columns
                    .iter()
                    .filter_map(|c| row.get(*c).map(|v| (c.to_string(), v.clone())))
                    .collect()
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.check_failure().await
    }
}

/// SQL-like semantics: a missing or null cell never matches.
fn matches_filter(row: &Row, filter: &Filter) -> bool {
    let Some(cell) = row.get(&filter.column).filter(|v| !v.is_null()) else {
        return false;
    };

    match filter.op {
        FilterOp::ILike => cell_text(cell)
            .to_lowercase()
            .contains(&filter.value.to_string().to_lowercase()),
        FilterOp::Eq => compare_cell(cell, &filter.value) == Some(Ordering::Equal),
        FilterOp::Gte => matches!(compare_cell(cell, &filter.value), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lte => matches!(compare_cell(cell, &filter.value), Some(Ordering::Less | Ordering::Equal)),
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_decimal(cell: &Value) -> Option<Decimal> {
    match cell {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

/// Orders `cell` relative to `value`, or `None` when they are not comparable.
fn compare_cell(cell: &Value, value: &FilterValue) -> Option<Ordering> {
    match value {
        FilterValue::Text(expected) => Some(cell_text(cell).as_str().cmp(expected.as_str())),
        FilterValue::Uuid(expected) => {
            let actual = Uuid::parse_str(cell.as_str()?).ok()?;
            Some(actual.cmp(expected))
        }
        FilterValue::Timestamp(expected) => {
            let actual = DateTime::parse_from_rfc3339(cell.as_str()?).ok()?.with_timezone(&Utc);
            Some(actual.cmp(expected))
        }
        FilterValue::Integer(expected) => cell_decimal(cell).map(|actual| actual.cmp(&Decimal::from(*expected))),
        FilterValue::Decimal(expected) => cell_decimal(cell).map(|actual| actual.cmp(expected)),
    }
}
