use crate::DbError;
use crate::query::{Entity, FetchQuery, FilterOp, Row};
use crate::store::{DataStore, PgStore};
use chrono::{DateTime, Utc};
use core_types::{
    Campaign, CampaignParticipant, Customer, CustomerProfile, Feedback, MlPrediction, Order,
    PointsTransaction, Promotion, Referral, Reward, RewardRecommendation, Segment, SegmentMember,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Narrows a ledger read. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerQuery {
    /// Substring of the customer id.
    pub customer: Option<String>,
    /// Earliest entry date, inclusive.
    pub since: Option<DateTime<Utc>>,
}

/// The `DbRepository` provides a high-level, application-specific interface
/// to the loyalty tables. It turns raw rows into typed records.
///
/// A row that cannot be decoded is logged and dropped; it never fails the
/// whole fetch. Store failures are propagated unchanged.
#[derive(Clone)]
pub struct DbRepository {
    store: Arc<dyn DataStore>,
}

impl DbRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Creates a repository backed by PostgreSQL.
    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(Arc::new(PgStore::new(pool)))
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        self.store.ping().await
    }

    /// Every customer, as of now.
    pub async fn customers(&self) -> Result<Vec<Customer>, DbError> {
        self.fetch(FetchQuery::new(Entity::Users).select(&["id", "name", "tier", "points_balance", "created_at"]))
            .await
    }

    /// Customers whose account was created inside `[start, end]`.
    pub async fn customers_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Customer>, DbError> {
        self.fetch(
            FetchQuery::new(Entity::Users)
                .select(&["id", "name", "tier", "points_balance", "created_at"])
                .between("created_at", start, end),
        )
        .await
    }

    /// Every customer with contact details.
    pub async fn customer_profiles(&self) -> Result<Vec<CustomerProfile>, DbError> {
        self.fetch(FetchQuery::new(Entity::Users)).await
    }

    /// The first customer whose email or phone contains `term`, ignoring case.
    pub async fn find_customer(&self, term: &str) -> Result<Option<CustomerProfile>, DbError> {
        let matches: Vec<CustomerProfile> =
            self.fetch(FetchQuery::new(Entity::Users).search(&["email", "phone"], term)).await?;
        if matches.len() > 1 {
            tracing::debug!(term, matches = matches.len(), "Customer search is ambiguous, using the first match");
        }
        Ok(matches.into_iter().next())
    }

    pub async fn orders_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Order>, DbError> {
        self.fetch(orders().between("date", start, end)).await
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, DbError> {
        self.fetch(orders()).await
    }

    pub async fn orders_of(&self, customer_id: Uuid) -> Result<Vec<Order>, DbError> {
        self.fetch(orders().filter("customer_id", FilterOp::Eq, customer_id)).await
    }

    pub async fn transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PointsTransaction>, DbError> {
        self.fetch(FetchQuery::new(Entity::Transactions).between("date", start, end)).await
    }

    pub async fn all_transactions(&self) -> Result<Vec<PointsTransaction>, DbError> {
        self.fetch(FetchQuery::new(Entity::Transactions)).await
    }

    pub async fn transactions_of(&self, customer_id: Uuid) -> Result<Vec<PointsTransaction>, DbError> {
        self.fetch(FetchQuery::new(Entity::Transactions).filter("customer_id", FilterOp::Eq, customer_id))
            .await
    }

    /// Ledger entries matching `query`.
    pub async fn ledger(&self, query: &LedgerQuery) -> Result<Vec<PointsTransaction>, DbError> {
        self.fetch(ledger_filters(FetchQuery::new(Entity::Transactions), "customer_id", query)).await
    }

    pub async fn predictions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MlPrediction>, DbError> {
        self.fetch(FetchQuery::new(Entity::MlPredictions).between("prediction_date", start, end))
            .await
    }

    pub async fn all_predictions(&self) -> Result<Vec<MlPrediction>, DbError> {
        self.fetch(FetchQuery::new(Entity::MlPredictions)).await
    }

    pub async fn predictions_of(&self, customer_id: Uuid) -> Result<Vec<MlPrediction>, DbError> {
        self.fetch(FetchQuery::new(Entity::MlPredictions).filter("customer_id", FilterOp::Eq, customer_id))
            .await
    }

    pub async fn campaigns(&self) -> Result<Vec<Campaign>, DbError> {
        self.fetch(FetchQuery::new(Entity::Campaigns)).await
    }

    pub async fn referrals_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Referral>, DbError> {
        self.fetch(referrals().between("date", start, end)).await
    }

    pub async fn all_referrals(&self) -> Result<Vec<Referral>, DbError> {
        self.fetch(referrals()).await
    }

    /// Referral bonuses matching `query`, keyed on the referrer.
    pub async fn referral_ledger(&self, query: &LedgerQuery) -> Result<Vec<Referral>, DbError> {
        self.fetch(ledger_filters(referrals(), "referrer_id", query)).await
    }

    pub async fn campaign_participants(&self) -> Result<Vec<CampaignParticipant>, DbError> {
        self.fetch(FetchQuery::new(Entity::CampaignParticipants)).await
    }

    pub async fn segments(&self) -> Result<Vec<Segment>, DbError> {
        self.fetch(FetchQuery::new(Entity::Segments)).await
    }

    pub async fn segment_members(&self) -> Result<Vec<SegmentMember>, DbError> {
        self.fetch(FetchQuery::new(Entity::UserSegments)).await
    }

    pub async fn promotions(&self) -> Result<Vec<Promotion>, DbError> {
        self.fetch(FetchQuery::new(Entity::Promotions)).await
    }

    pub async fn feedback_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Feedback>, DbError> {
        self.fetch(
            FetchQuery::new(Entity::Feedback)
                .select(&["id", "nps_score", "date"])
                .between("date", start, end),
        )
        .await
    }

    pub async fn rewards(&self) -> Result<Vec<Reward>, DbError> {
        self.fetch(FetchQuery::new(Entity::Rewards)).await
    }

    /// Links from a prediction to the reward suggested for it.
    pub async fn reward_recommendations(&self) -> Result<Vec<RewardRecommendation>, DbError> {
        self.fetch(FetchQuery::new(Entity::PredRew)).await
    }

    async fn fetch<T: DeserializeOwned>(&self, query: FetchQuery) -> Result<Vec<T>, DbError> {
        let rows = self.store.fetch(&query).await.inspect_err(|e| {
            tracing::error!(entity = %query.entity, error = %e, "Failed to fetch rows");
        })?;
        Ok(decode_rows(query.entity, rows))
    }
}

fn orders() -> FetchQuery {
    FetchQuery::new(Entity::Orders).select(&["id", "customer_id", "total", "subtotal", "date"])
}

fn referrals() -> FetchQuery {
    FetchQuery::new(Entity::Referrals).select(&["id", "referrer_id", "reward_points", "date", "status"])
}

fn ledger_filters(mut query: FetchQuery, customer_column: &str, ledger: &LedgerQuery) -> FetchQuery {
    if let Some(customer) = ledger.customer.as_deref().filter(|c| !c.is_empty()) {
        query = query.search(&[customer_column], customer);
    }
    if let Some(since) = ledger.since {
        query = query.filter("date", FilterOp::Gte, since);
    }
    query
}

/// Decodes each row into `T`, skipping rows that do not fit.
pub fn decode_rows<T: DeserializeOwned>(entity: Entity, rows: Vec<Row>) -> Vec<T> {
    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(Value::Object(row)) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(entity = %entity, error = %e, "Skipping malformed row");
                None
            }
        })
        .collect();

    if decoded.len() < total {
        tracing::warn!(entity = %entity, skipped = total - decoded.len(), total, "Dropped malformed rows");
    }
    decoded
}
