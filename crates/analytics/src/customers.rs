//! The customer list and the staff lookup card.

use crate::engine::{add, add_points, percentage, ratio};
use crate::error::AnalyticsError;
use crate::present::round2;
use crate::recommend::latest_predictions;
use crate::segments::{ACTIVE_WINDOW_DAYS, EMPTY_GROUP_RETENTION};
use chrono::{DateTime, Duration, Utc};
use core_types::{CustomerProfile, MlPrediction, Order, PointsTransaction, Segment, SegmentMember, Tier};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

const UNKNOWN: &str = "Unknown";

/// Churn probability assumed when the model has not scored a customer.
pub const DEFAULT_CHURN_PROBABILITY: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Points balance needed to reach Silver and Gold.
pub const SILVER_THRESHOLD: i64 = 1000;
pub const GOLD_THRESHOLD: i64 = 2000;

/// One row of the customer list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOverview {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub tier: Tier,
    pub points: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub spend: Decimal,
    /// Latest ledger entry, or the time of the request for a customer without one.
    pub last_activity: DateTime<Utc>,
    pub segment: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub churn_risk: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub retention_rate: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct OverviewInputs<'a> {
    pub profiles: &'a [CustomerProfile],
    pub transactions: &'a [PointsTransaction],
    pub segments: &'a [Segment],
    pub members: &'a [SegmentMember],
}

/// One row per customer, in customer order.
///
/// Retention is the share of a customer's ledger entries inside the active
/// window and churn risk is its complement. Customers with no entries get
/// the neutral 50 for both.
pub fn customer_overview(inputs: OverviewInputs<'_>, now: DateTime<Utc>) -> Result<Vec<CustomerOverview>, AnalyticsError> {
    let since = now - Duration::days(ACTIVE_WINDOW_DAYS);
    let segment_names: HashMap<Uuid, &str> = inputs.segments.iter().map(|s| (s.id, s.name.as_str())).collect();
    let mut segment_of: HashMap<Uuid, &str> = HashMap::new();
    for m in inputs.members {
        if let Some(name) = segment_names.get(&m.segment_id) {
            segment_of.entry(m.customer_id).or_insert(*name);
        }
    }
    let mut ledgers: HashMap<Uuid, Vec<&PointsTransaction>> = HashMap::new();
    for t in inputs.transactions {
        ledgers.entry(t.customer_id).or_default().push(t);
    }

    inputs
        .profiles
        .iter()
        .map(|profile| {
            let ledger = ledgers.get(&profile.id).map(Vec::as_slice).unwrap_or_default();

            let spend = ledger
                .iter()
                .filter_map(|t| t.amount)
                .filter(|a| *a > Decimal::ZERO)
                .try_fold(Decimal::ZERO, |sum, a| add(sum, a, "customer spend"))?;
            let recent = ledger.iter().filter(|t| t.date >= since).count();
            let (retention_rate, churn_risk) = if ledger.is_empty() {
                (EMPTY_GROUP_RETENTION, EMPTY_GROUP_RETENTION)
            } else {
                let retention = round2(percentage(Decimal::from(recent), Decimal::from(ledger.len()))?);
                (retention, Decimal::ONE_HUNDRED - retention)
            };

            Ok(CustomerOverview {
                id: profile.id,
                name: profile.name.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                email: profile.email.clone(),
                tier: profile.tier,
                points: profile.points_balance,
                spend,
                last_activity: ledger.iter().map(|t| t.date).max().unwrap_or(now),
                segment: segment_of.get(&profile.id).copied().unwrap_or(UNKNOWN).to_string(),
                churn_risk,
                retention_rate,
            })
        })
        .collect()
}

/// Recency in days, order count and lifetime spend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rfm {
    pub recency: i64,
    pub frequency: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub monetary: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierProgress {
    pub next_tier: Option<Tier>,
    pub points_to_next: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub progress_percentage: Decimal,
}

impl TierProgress {
    /// Progress towards the next tier. Gold is complete; the remaining points
    /// never go below zero and the percentage never above 100.
    pub fn of(tier: Tier, balance: i64) -> Self {
        let (next_tier, threshold) = match tier {
            Tier::Bronze => (Tier::Silver, SILVER_THRESHOLD),
            Tier::Silver => (Tier::Gold, GOLD_THRESHOLD),
            Tier::Gold => {
                return Self { next_tier: None, points_to_next: 0, progress_percentage: Decimal::ONE_HUNDRED };
            }
        };
        let progress = Decimal::from(balance.max(0)) / Decimal::from(threshold) * Decimal::ONE_HUNDRED;
        Self {
            next_tier: Some(next_tier),
            points_to_next: threshold.saturating_sub(balance).max(0),
            progress_percentage: round2(progress.min(Decimal::ONE_HUNDRED)),
        }
    }
}

/// What staff see after looking a customer up.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerLookup {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub points: i64,
    pub tier: Tier,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_spend: Decimal,
    pub join_date: DateTime<Utc>,
    pub last_activity: Option<DateTime<Utc>>,
    pub rfm: Rfm,
    #[serde(with = "rust_decimal::serde::float")]
    pub churn_probability: Decimal,
    #[serde(rename = "points_earned")]
    pub points_earned: i64,
    #[serde(rename = "points_redeemed")]
    pub points_redeemed: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_order_value: Decimal,
    pub last_purchase_date: Option<DateTime<Utc>>,
    /// Orders per month, over a year.
    #[serde(with = "rust_decimal::serde::float")]
    pub purchase_frequency: Decimal,
    pub tier_progress: TierProgress,
}

#[derive(Debug, Clone, Copy)]
pub struct LookupInputs<'a> {
    pub profile: &'a CustomerProfile,
    pub orders: &'a [Order],
    pub transactions: &'a [PointsTransaction],
    pub predictions: &'a [MlPrediction],
}

/// Builds the lookup card of one customer. Rows of other customers are ignored.
pub fn customer_lookup(inputs: LookupInputs<'_>, now: DateTime<Utc>) -> Result<CustomerLookup, AnalyticsError> {
    let profile = inputs.profile;
    let orders: Vec<&Order> = inputs.orders.iter().filter(|o| o.customer_id == profile.id).collect();
    let ledger = inputs.transactions.iter().filter(|t| t.customer_id == profile.id);

    let total_spend = orders
        .iter()
        .try_fold(Decimal::ZERO, |sum, o| add(sum, o.total, "customer spend"))?;
    let order_count = Decimal::from(orders.len());
    let last_purchase = orders.iter().map(|o| o.date).max();

    let mut earned = 0i64;
    let mut redeemed = 0i64;
    for t in ledger {
        if t.is_earn() {
            earned = add_points(earned, t.points, "points earned")?;
        } else if t.is_redeem() {
            redeemed = add_points(redeemed, t.points, "points redeemed")?;
        }
    }

    let churn_probability = latest_predictions(inputs.predictions)
        .get(&profile.id)
        .and_then(|p| p.churn_probability)
        .unwrap_or(DEFAULT_CHURN_PROBABILITY);

    Ok(CustomerLookup {
        id: profile.id,
        name: profile.name.clone(),
        email: profile.email.clone(),
        phone: profile.phone.clone(),
        points: profile.points_balance,
        tier: profile.tier,
        total_spend,
        join_date: profile.created_at,
        last_activity: profile.last_activity,
        rfm: Rfm {
            recency: last_purchase.map_or(0, |last| (now - last).num_days().max(0)),
            frequency: orders.len() as i64,
            monetary: total_spend,
        },
        churn_probability,
        points_earned: profile.points_earned.unwrap_or(earned),
        points_redeemed: redeemed,
        avg_order_value: round2(ratio(total_spend, order_count)?),
        last_purchase_date: last_purchase,
        purchase_frequency: round2(ratio(order_count, Decimal::from(12))?),
        tier_progress: TierProgress::of(profile.tier, profile.points_balance),
    })
}
