use crate::fiscal::FiscalPeriod;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The loyalty KPIs of one fiscal period.
///
/// This struct is the output of `AnalyticsEngine::calculate_kpis`. One is
/// computed for the current and one for the prior period of every request;
/// neither is mutated after the engine returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub period: FiscalPeriod,

    // I. Customer base (current snapshot, shared by both periods)
    pub total_customers: i64,
    pub avg_points_balance: Decimal,

    // II. Spend
    pub total_spend: Decimal,
    pub order_count: i64,
    pub avg_order_value: Decimal,

    // III. Points ledger
    pub points_earned: i64,
    pub points_redeemed: i64,

    // IV. Model output
    pub avg_clv: Decimal,

    // V. Retention
    pub active_customers: i64,
    pub retention_rate: Decimal,

    // VI. Campaigns (evaluated at query time, not historically)
    pub active_campaigns: i64,
}

impl KpiSnapshot {
    /// Creates a zeroed snapshot for `period`.
    pub fn new(period: FiscalPeriod) -> Self {
        Self {
            period,
            total_customers: 0,
            avg_points_balance: Decimal::ZERO,
            total_spend: Decimal::ZERO,
            order_count: 0,
            avg_order_value: Decimal::ZERO,
            points_earned: 0,
            points_redeemed: 0,
            avg_clv: Decimal::ZERO,
            active_customers: 0,
            retention_rate: Decimal::ZERO,
            active_campaigns: 0,
        }
    }
}

/// Engagement KPIs of one fiscal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    pub period: FiscalPeriod,
    pub avg_nps: Decimal,
    pub referral_count: i64,
    pub new_customers: i64,
    pub referral_rate: Decimal,
    /// Mean churn probability expressed as a percentage.
    pub avg_churn_risk_pct: Decimal,
    pub ordering_customers: i64,
    pub repeat_customers: i64,
    pub repeat_purchase_rate: Decimal,
}

impl EngagementSnapshot {
    pub fn new(period: FiscalPeriod) -> Self {
        Self {
            period,
            avg_nps: Decimal::ZERO,
            referral_count: 0,
            new_customers: 0,
            referral_rate: Decimal::ZERO,
            avg_churn_risk_pct: Decimal::ZERO,
            ordering_customers: 0,
            repeat_customers: 0,
            repeat_purchase_rate: Decimal::ZERO,
        }
    }
}
