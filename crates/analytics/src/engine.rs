use crate::error::AnalyticsError;
use crate::fiscal::FiscalPeriod;
use crate::report::{EngagementSnapshot, KpiSnapshot};
use core_types::{Campaign, Customer, Feedback, MlPrediction, Order, PointsTransaction, Referral};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Rows fetched for one period of the main KPI board.
#[derive(Debug, Clone, Default)]
pub struct PeriodActivity {
    pub orders: Vec<Order>,
    pub transactions: Vec<PointsTransaction>,
    pub predictions: Vec<MlPrediction>,
}

/// Rows fetched for one period of the engagement board.
#[derive(Debug, Clone, Default)]
pub struct EngagementActivity {
    pub feedback: Vec<Feedback>,
    pub referrals: Vec<Referral>,
    /// Customers whose `created_at` falls inside the period.
    pub new_customers: Vec<Customer>,
    pub predictions: Vec<MlPrediction>,
    pub orders: Vec<Order>,
}

/// A stateless calculator that reduces fetched rows to period metrics.
///
/// Every period-scoped row is re-checked against the period, so rows a store
/// returns outside the window never leak into a metric. Empty inputs yield
/// zeroes, never errors.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the main KPI board for one period.
    ///
    /// # Arguments
    ///
    /// * `period` - The fiscal period the activity rows belong to.
    /// * `customers` - The whole customer base as of now. The same slice is
    ///   used for the current and the prior period.
    /// * `activity` - Orders, ledger entries and predictions of the period.
    /// * `campaigns` - All campaigns; only their current status matters.
    ///
    /// # Errors
    ///
    /// `AnalyticsError::Overflow` when a sum or average leaves the numeric range.
    pub fn calculate_kpis(
        &self,
        period: FiscalPeriod,
        customers: &[Customer],
        activity: &PeriodActivity,
        campaigns: &[Campaign],
    ) -> Result<KpiSnapshot, AnalyticsError> {
        let mut snapshot = KpiSnapshot::new(period);

        self.calculate_customer_base(customers, &mut snapshot)?;
        self.calculate_spend(&activity.orders, &mut snapshot)?;
        self.calculate_points(&activity.transactions, &mut snapshot)?;
        self.calculate_clv(&activity.predictions, &mut snapshot)?;
        snapshot.active_campaigns = campaigns.iter().filter(|c| c.is_active()).count() as i64;

        Ok(snapshot)
    }

    fn calculate_customer_base(&self, customers: &[Customer], snapshot: &mut KpiSnapshot) -> Result<(), AnalyticsError> {
        snapshot.total_customers = customers.len() as i64;
        let total_points = customers
            .iter()
            .try_fold(0i64, |sum, c| sum.checked_add(c.points_balance))
            .ok_or_else(|| overflow("total points balance"))?;
        snapshot.avg_points_balance =
            ratio(Decimal::from(total_points), Decimal::from(snapshot.total_customers))?;
        Ok(())
    }

    /// Spend, order value and retention. Requires the customer base first.
    fn calculate_spend(&self, orders: &[Order], snapshot: &mut KpiSnapshot) -> Result<(), AnalyticsError> {
        let period = snapshot.period;
        let mut active = HashSet::new();

        for order in orders.iter().filter(|o| period.contains(o.date)) {
            snapshot.total_spend = add(snapshot.total_spend, order.total, "total spend")?;
            snapshot.order_count += 1;
            active.insert(order.customer_id);
        }

        snapshot.avg_order_value = ratio(snapshot.total_spend, Decimal::from(snapshot.order_count))?;
        snapshot.active_customers = active.len() as i64;
        snapshot.retention_rate = percentage(
            Decimal::from(snapshot.active_customers),
            Decimal::from(snapshot.total_customers),
        )?;
        Ok(())
    }

    fn calculate_points(&self, transactions: &[PointsTransaction], snapshot: &mut KpiSnapshot) -> Result<(), AnalyticsError> {
        let period = snapshot.period;
        for t in transactions.iter().filter(|t| period.contains(t.date)) {
            if t.is_earn() {
                snapshot.points_earned = add_points(snapshot.points_earned, t.points, "points earned")?;
            } else if t.is_redeem() {
                snapshot.points_redeemed = add_points(snapshot.points_redeemed, t.points, "points redeemed")?;
            }
        }
        Ok(())
    }

    fn calculate_clv(&self, predictions: &[MlPrediction], snapshot: &mut KpiSnapshot) -> Result<(), AnalyticsError> {
        let period = snapshot.period;
        let (sum, count) = predictions
            .iter()
            .filter(|p| period.contains(p.prediction_date))
            .try_fold((Decimal::ZERO, 0i64), |(sum, count), p| {
                Ok::<_, AnalyticsError>((add(sum, p.clv_predicted, "average CLV")?, count + 1))
            })?;
        snapshot.avg_clv = ratio(sum, Decimal::from(count))?;
        Ok(())
    }

    /// Calculates the engagement board for one period.
    pub fn calculate_engagement(
        &self,
        period: FiscalPeriod,
        activity: &EngagementActivity,
    ) -> Result<EngagementSnapshot, AnalyticsError> {
        let mut snapshot = EngagementSnapshot::new(period);

        // --- NPS ---
        let (nps_sum, nps_count) = activity
            .feedback
            .iter()
            .filter(|f| period.contains(f.date))
            .fold((0i64, 0i64), |(sum, count), f| (sum.saturating_add(i64::from(f.nps_score)), count + 1));
        snapshot.avg_nps = ratio(Decimal::from(nps_sum), Decimal::from(nps_count))?;

        // --- Referral rate ---
        snapshot.referral_count = activity
            .referrals
            .iter()
            .filter(|r| period.contains(r.date))
            .map(|r| r.id)
            .collect::<HashSet<Uuid>>()
            .len() as i64;
        snapshot.new_customers = activity
            .new_customers
            .iter()
            .filter(|c| period.contains(c.created_at))
            .count() as i64;
        snapshot.referral_rate = percentage(
            Decimal::from(snapshot.referral_count),
            Decimal::from(snapshot.new_customers),
        )?;

        // --- Churn risk ---
        let (churn_sum, churn_count) = activity
            .predictions
            .iter()
            .filter(|p| period.contains(p.prediction_date))
            .filter_map(|p| p.churn_probability)
            .try_fold((Decimal::ZERO, 0i64), |(sum, count), c| {
                Ok::<_, AnalyticsError>((add(sum, c, "average churn risk")?, count + 1))
            })?;
        snapshot.avg_churn_risk_pct = percentage(churn_sum, Decimal::from(churn_count))?;

        // --- Repeat purchases ---
        let mut orders_per_customer: HashMap<Uuid, u32> = HashMap::new();
        for order in activity.orders.iter().filter(|o| period.contains(o.date)) {
            let count = orders_per_customer.entry(order.customer_id).or_insert(0);
            *count = count.saturating_add(1);
        }
        snapshot.ordering_customers = orders_per_customer.len() as i64;
        snapshot.repeat_customers = orders_per_customer.values().filter(|&&n| n > 1).count() as i64;
        snapshot.repeat_purchase_rate = percentage(
            Decimal::from(snapshot.repeat_customers),
            Decimal::from(snapshot.ordering_customers),
        )?;

        Ok(snapshot)
    }
}

fn overflow(what: &str) -> AnalyticsError {
    AnalyticsError::Overflow(what.to_string())
}

/// `sum + value`, failing with `Overflow(what)`.
pub(crate) fn add(sum: Decimal, value: Decimal, what: &str) -> Result<Decimal, AnalyticsError> {
    sum.checked_add(value).ok_or_else(|| overflow(what))
}

/// Adds the magnitude of `points` to `sum`. Ledger signs only mark the direction.
pub(crate) fn add_points(sum: i64, points: i64, what: &str) -> Result<i64, AnalyticsError> {
    points
        .checked_abs()
        .and_then(|magnitude| sum.checked_add(magnitude))
        .ok_or_else(|| overflow(what))
}

/// `numerator / denominator`, or zero when the denominator is zero.
pub(crate) fn ratio(numerator: Decimal, denominator: Decimal) -> Result<Decimal, AnalyticsError> {
    if denominator.is_zero() {
        return Ok(Decimal::ZERO);
    }
    numerator
        .checked_div(denominator)
        .ok_or_else(|| overflow(&format!("{numerator} / {denominator}")))
}

/// `part / whole * 100`, or zero when `whole` is zero.
pub(crate) fn percentage(part: Decimal, whole: Decimal) -> Result<Decimal, AnalyticsError> {
    ratio(part, whole)?
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| overflow(&format!("{part} as a percentage of {whole}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use core_types::{CampaignStatus, Tier, TransactionType};
    use rust_decimal_macros::dec;

    fn q1_2024() -> FiscalPeriod {
        FiscalPeriod {
            start: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        }
    }

    fn day(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 10, 0, 0).unwrap()
    }

    fn customer(points: i64) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            name: None,
            tier: Tier::Bronze,
            points_balance: points,
            created_at: day(1, 1),
        }
    }

    fn order(customer_id: Uuid, total: Decimal, date: DateTime<Utc>) -> Order {
        Order { id: Uuid::new_v4(), customer_id, total, subtotal: None, date }
    }

    fn ledger(points: i64, kind: TransactionType, date: DateTime<Utc>) -> PointsTransaction {
        PointsTransaction {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            kind,
            points,
            amount: None,
            date,
            context: None,
        }
    }

    #[test]
    fn empty_period_yields_zeroes() {
        let snapshot = AnalyticsEngine::new().calculate_kpis(q1_2024(), &[], &PeriodActivity::default(), &[]).unwrap();

        assert_eq!(snapshot.total_customers, 0);
        assert_eq!(snapshot.avg_points_balance, Decimal::ZERO);
        assert_eq!(snapshot.avg_order_value, Decimal::ZERO);
        assert_eq!(snapshot.avg_clv, Decimal::ZERO);
        assert_eq!(snapshot.retention_rate, Decimal::ZERO);
        assert_eq!(snapshot.active_campaigns, 0);
    }

    #[test]
    fn zero_orders_give_zero_average_order_value() {
        let customers = vec![customer(100), customer(300)];
        let snapshot =
            AnalyticsEngine::new().calculate_kpis(q1_2024(), &customers, &PeriodActivity::default(), &[]).unwrap();

        assert_eq!(snapshot.order_count, 0);
        assert_eq!(snapshot.avg_order_value, Decimal::ZERO);
        assert_eq!(snapshot.avg_points_balance, dec!(200));
        assert_eq!(snapshot.retention_rate, Decimal::ZERO);
    }

    #[test]
    fn spend_and_retention_count_distinct_ordering_customers() {
        let customers: Vec<Customer> = (0..4).map(|_| customer(0)).collect();
        let activity = PeriodActivity {
            orders: vec![
                order(customers[0].id, dec!(100), day(4, 2)),
                order(customers[0].id, dec!(50.50), day(5, 20)),
                order(customers[1].id, dec!(49.50), day(6, 30)),
                // Outside the period: ignored.
                order(customers[2].id, dec!(999), day(7, 1)),
            ],
            ..Default::default()
        };

        let snapshot = AnalyticsEngine::new().calculate_kpis(q1_2024(), &customers, &activity, &[]).unwrap();

        assert_eq!(snapshot.total_spend, dec!(200));
        assert_eq!(snapshot.order_count, 3);
        assert_eq!(snapshot.avg_order_value.round_dp(2), dec!(66.67));
        assert_eq!(snapshot.active_customers, 2);
        assert_eq!(snapshot.retention_rate, dec!(50));
    }

    #[test]
    fn points_split_by_sign_not_by_type() {
        let activity = PeriodActivity {
            transactions: vec![
                ledger(120, TransactionType::EarnPoints, day(4, 10)),
                ledger(80, TransactionType::WelcomeBonus, day(4, 11)),
                ledger(-50, TransactionType::RedeemPoints, day(5, 1)),
                ledger(-10, TransactionType::Adjustment, day(5, 2)),
                ledger(0, TransactionType::Adjustment, day(5, 3)),
            ],
            ..Default::default()
        };

        let snapshot = AnalyticsEngine::new().calculate_kpis(q1_2024(), &[], &activity, &[]).unwrap();

        assert_eq!(snapshot.points_earned, 200);
        assert_eq!(snapshot.points_redeemed, 60);
    }

    #[test]
    fn overflowing_sums_are_errors() {
        let engine = AnalyticsEngine::new();

        let customers = vec![customer(i64::MAX), customer(1)];
        let err = engine.calculate_kpis(q1_2024(), &customers, &PeriodActivity::default(), &[]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Overflow(ref what) if what == "total points balance"));

        let activity = PeriodActivity {
            transactions: vec![ledger(i64::MIN, TransactionType::Adjustment, day(5, 1))],
            ..Default::default()
        };
        let err = engine.calculate_kpis(q1_2024(), &[], &activity, &[]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Overflow(ref what) if what == "points redeemed"));

        let buyer = Uuid::new_v4();
        let activity = PeriodActivity {
            orders: vec![order(buyer, Decimal::MAX, day(4, 2)), order(buyer, Decimal::MAX, day(4, 3))],
            ..Default::default()
        };
        let err = engine.calculate_kpis(q1_2024(), &[], &activity, &[]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Overflow(ref what) if what == "total spend"));
    }

    #[test]
    fn clv_is_mean_of_predictions_in_period_and_campaigns_count_active_only() {
        let prediction = |clv: Decimal, date| MlPrediction {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            clv_predicted: clv,
            churn_probability: None,
            prediction_date: date,
        };
        let campaign = |status| Campaign {
            id: Uuid::new_v4(),
            name: "Spring".into(),
            kind: None,
            status,
            start_date: None,
            end_date: None,
            rules: None,
            points_issued: 0,
            total_revenue: None,
        };
        let activity = PeriodActivity {
            predictions: vec![prediction(dec!(300), day(4, 5)), prediction(dec!(500), day(6, 1))],
            ..Default::default()
        };
        let campaigns = vec![
            campaign(CampaignStatus::Active),
            campaign(CampaignStatus::Inactive),
            campaign(CampaignStatus::Active),
        ];

        let snapshot = AnalyticsEngine::new().calculate_kpis(q1_2024(), &[], &activity, &campaigns).unwrap();

        assert_eq!(snapshot.avg_clv, dec!(400));
        assert_eq!(snapshot.active_campaigns, 2);
    }

    #[test]
    fn engagement_rates_follow_zero_row_policy() {
        let snapshot = AnalyticsEngine::new().calculate_engagement(q1_2024(), &EngagementActivity::default()).unwrap();
        assert_eq!(snapshot.avg_nps, Decimal::ZERO);
        assert_eq!(snapshot.referral_rate, Decimal::ZERO);
        assert_eq!(snapshot.avg_churn_risk_pct, Decimal::ZERO);
        assert_eq!(snapshot.repeat_purchase_rate, Decimal::ZERO);
    }

    #[test]
    fn engagement_metrics() {
        let buyer = Uuid::new_v4();
        let one_off = Uuid::new_v4();
        let activity = EngagementActivity {
            feedback: vec![
                Feedback { id: Uuid::new_v4(), nps_score: 9, date: day(4, 3) },
                Feedback { id: Uuid::new_v4(), nps_score: 6, date: day(4, 4) },
            ],
            referrals: vec![Referral {
                id: Uuid::new_v4(),
                referrer_id: buyer,
                reward_points: 100,
                date: day(5, 5),
                status: None,
            }],
            new_customers: vec![customer(0), customer(0)]
                .into_iter()
                .map(|mut c| {
                    c.created_at = day(5, 1);
                    c
                })
                .collect(),
            predictions: vec![MlPrediction {
                id: Uuid::new_v4(),
                customer_id: buyer,
                clv_predicted: dec!(10),
                churn_probability: Some(dec!(0.25)),
                prediction_date: day(6, 1),
            }],
            orders: vec![
                order(buyer, dec!(10), day(4, 1)),
                order(buyer, dec!(10), day(4, 2)),
                order(one_off, dec!(10), day(4, 3)),
            ],
        };

        let snapshot = AnalyticsEngine::new().calculate_engagement(q1_2024(), &activity).unwrap();

        assert_eq!(snapshot.avg_nps, dec!(7.5));
        assert_eq!(snapshot.referral_rate, dec!(50));
        assert_eq!(snapshot.avg_churn_risk_pct, dec!(25));
        assert_eq!(snapshot.ordering_customers, 2);
        assert_eq!(snapshot.repeat_customers, 1);
        assert_eq!(snapshot.repeat_purchase_rate, dec!(50));
    }
}
