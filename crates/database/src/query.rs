use crate::error::DbError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// A fetched row: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// The tables the dashboard reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Users,
    Orders,
    Transactions,
    MlPredictions,
    Campaigns,
    Referrals,
    Feedback,
    Rewards,
    PredRew,
    Segments,
    UserSegments,
    CampaignParticipants,
    Promotions,
}

impl Entity {
    pub const ALL: [Entity; 13] = [
        Entity::Users,
        Entity::Orders,
        Entity::Transactions,
        Entity::MlPredictions,
        Entity::Campaigns,
        Entity::Referrals,
        Entity::Feedback,
        Entity::Rewards,
        Entity::PredRew,
        Entity::Segments,
        Entity::UserSegments,
        Entity::CampaignParticipants,
        Entity::Promotions,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Entity::Users => "users",
            Entity::Orders => "orders",
            Entity::Transactions => "transactions",
            Entity::MlPredictions => "ml_predictions",
            Entity::Campaigns => "campaigns",
            Entity::Referrals => "referrals",
            Entity::Feedback => "feedback",
            Entity::Rewards => "rewards",
            Entity::PredRew => "pred_rew",
            Entity::Segments => "segments",
            Entity::UserSegments => "user_segments",
            Entity::CampaignParticipants => "campaign_participants",
            Entity::Promotions => "promotions",
        }
    }

    /// The columns a query may filter on or project.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Entity::Users => &[
                "id",
                "name",
                "email",
                "phone",
                "tier",
                "points_balance",
                "points_earned",
                "created_at",
                "last_activity",
            ],
            Entity::Orders => &["id", "customer_id", "total", "subtotal", "date"],
            Entity::Transactions => &["id", "customer_id", "type", "points", "amount", "date", "context"],
            Entity::MlPredictions => {
                &["id", "customer_id", "clv_predicted", "churn_probability", "prediction_date"]
            }
            Entity::Campaigns => &[
                "id",
                "name",
                "type",
                "status",
                "start_date",
                "end_date",
                "rules",
                "points_issued",
                "total_revenue",
            ],
            Entity::Referrals => &["id", "referrer_id", "referee_id", "reward_points", "date", "status"],
            Entity::Feedback => &["id", "customer_id", "nps_score", "comment", "date"],
            Entity::Rewards => &["id", "name", "points_cost"],
            Entity::PredRew => &["ml_prediction_id", "reward_id", "reason"],
            Entity::Segments => &["id", "name"],
            Entity::UserSegments => &["segment_id", "customer_id"],
            Entity::CampaignParticipants => &["campaign_id", "customer_id", "joined_at"],
            Entity::Promotions => &["id", "title", "message", "type", "status", "sent_date", "target_tier"],
        }
    }

    /// Resolves `name` to the allow-listed column, so that only static
    /// identifiers ever reach the SQL text.
    pub fn column(&self, name: &str) -> Result<&'static str, DbError> {
        self.columns()
            .iter()
            .copied()
            .find(|c| *c == name)
            .ok_or_else(|| DbError::UnknownColumn { entity: self.table(), column: name.to_string() })
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
    /// Case-insensitive substring match.
    ILike,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Integer(i64),
    Decimal(Decimal),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        FilterValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<Decimal> for FilterValue {
    fn from(value: Decimal) -> Self {
        FilterValue::Decimal(value)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(v) => f.write_str(v),
            FilterValue::Uuid(v) => write!(f, "{v}"),
            FilterValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            FilterValue::Integer(v) => write!(f, "{v}"),
            FilterValue::Decimal(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

/// A single-table read: `SELECT projection FROM entity WHERE filters...`.
///
/// Filters are combined with AND. When `any_of` is non-empty, at least one of
/// its filters must hold as well. A `None` projection selects every
/// allow-listed column.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchQuery {
    pub entity: Entity,
    pub filters: Vec<Filter>,
    pub any_of: Vec<Filter>,
    pub projection: Option<Vec<String>>,
}

impl FetchQuery {
    pub fn new(entity: Entity) -> Self {
        Self { entity, filters: Vec::new(), any_of: Vec::new(), projection: None }
    }

    pub fn filter(mut self, column: &str, op: FilterOp, value: impl Into<FilterValue>) -> Self {
        self.filters.push(Filter { column: column.to_string(), op, value: value.into() });
        self
    }

    /// Case-insensitive substring search: matches rows where any of `columns`
    /// contains `term`.
    pub fn search(mut self, columns: &[&str], term: &str) -> Self {
        self.any_of.extend(columns.iter().map(|column| Filter {
            column: column.to_string(),
            op: FilterOp::ILike,
            value: FilterValue::from(term),
        }));
        self
    }

    /// `start <= column <= end`, both inclusive.
    pub fn between(self, column: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.filter(column, FilterOp::Gte, start).filter(column, FilterOp::Lte, end)
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.projection = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Checks every filter and projected column against the entity's allow-list.
    pub fn validate(&self) -> Result<(), DbError> {
        for filter in self.filters.iter().chain(&self.any_of) {
            self.entity.column(&filter.column)?;
        }
        for column in self.projection.iter().flatten() {
            self.entity.column(column)?;
        }
        Ok(())
    }

    /// The allow-listed columns to return, in projection order.
    pub fn selected_columns(&self) -> Result<Vec<&'static str>, DbError> {
        match &self.projection {
            Some(columns) => columns.iter().map(|c| self.entity.column(c)).collect(),
            None => Ok(self.entity.columns().to_vec()),
        }
    }
}
