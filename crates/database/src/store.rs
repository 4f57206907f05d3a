use crate::error::DbError;
use crate::query::{FetchQuery, Filter, FilterOp, FilterValue, Row};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::QueryBuilder;

/// Read access to the loyalty tables.
///
/// Implementations:
/// - `PgStore`: PostgreSQL through a `PgPool`
/// - `MemoryStore`: in-memory rows for tests and demos
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Runs a single-table query and returns the matching rows as JSON objects.
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Row>, DbError>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> Result<(), DbError>;
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Builds `SELECT COALESCE(json_agg(row_to_json(t)), '[]') FROM (SELECT ... ) t`.
///
/// Identifiers come from the entity allow-list only; every value is bound.
pub(crate) fn build_select(query: &FetchQuery) -> Result<QueryBuilder<'static, Postgres>, DbError> {
    query.validate()?;
    let columns = query.selected_columns()?;

    let mut qb = QueryBuilder::new("SELECT COALESCE(json_agg(row_to_json(t)), '[]'::json) FROM (SELECT ");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format!("\"{column}\""));
    }
    qb.push(format!(" FROM \"{}\"", query.entity.table()));

    let mut clause = " WHERE ";
    for filter in &query.filters {
        qb.push(clause);
        push_filter(&mut qb, query, filter)?;
        clause = " AND ";
    }
    if !query.any_of.is_empty() {
        qb.push(clause);
        qb.push("(");
        for (i, filter) in query.any_of.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            push_filter(&mut qb, query, filter)?;
        }
        qb.push(")");
    }
    qb.push(") t");

    Ok(qb)
}

fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, query: &FetchQuery, filter: &Filter) -> Result<(), DbError> {
    let column = query.entity.column(&filter.column)?;
    match filter.op {
        FilterOp::ILike => {
            qb.push(format!("\"{column}\"::text ILIKE "));
            qb.push_bind(format!("%{}%", escape_like(&filter.value.to_string())));
        }
        op => {
            qb.push(format!("\"{column}\""));
            qb.push(match op {
                FilterOp::Gte => " >= ",
                FilterOp::Lte => " <= ",
                _ => " = ",
            });
            push_value(qb, &filter.value);
        }
    }
    Ok(())
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Text(v) => qb.push_bind(v.clone()),
        FilterValue::Uuid(v) => qb.push_bind(*v),
        FilterValue::Timestamp(v) => qb.push_bind(*v),
        FilterValue::Integer(v) => qb.push_bind(*v),
        FilterValue::Decimal(v) => qb.push_bind(*v),
    };
}

fn escape_like(pattern: &str) -> String {
    pattern.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[async_trait]
impl DataStore for PgStore {
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Row>, DbError> {
        let mut qb = build_select(query)?;
        let rows = qb.build_query_scalar::<Value>().fetch_one(&self.pool).await?;

        match rows {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(row) => Some(row),
                    _ => None,
                })
                .collect()),
            other => Err(DbError::Unavailable(format!(
                "expected a JSON array from {}, got {other}",
                query.entity
            ))),
        }
    }

    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
