//! Fixed card layouts of the dashboard boards.
//!
//! The order of each layout is the order the front-end renders cards in;
//! callers must not reorder the returned records.

use crate::compare::{DeltaMode, compare_with};
use crate::error::AnalyticsError;
use crate::present::{ChangeUnit, DisplayHints, Presenter, ValueFormat};
use crate::report::{EngagementSnapshot, KpiSnapshot};
use core_types::DisplayRecord;
use rust_decimal::Decimal;

/// One card of a layout: which metric, how to compare it and how to show it.
#[derive(Debug, Clone, Copy)]
pub struct CardSpec<M> {
    pub metric: M,
    pub title: &'static str,
    pub mode: DeltaMode,
    pub hints: DisplayHints,
}

/// Read access to a snapshot's metrics by key.
pub trait MetricSource<M> {
    fn metric(&self, metric: M) -> Decimal;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiMetric {
    TotalCustomers,
    AvgPointsBalance,
    AvgOrderValue,
    PointsEarned,
    PointsRedeemed,
    RetentionRate,
    AvgClv,
    ActiveCampaigns,
}

impl MetricSource<KpiMetric> for KpiSnapshot {
    fn metric(&self, metric: KpiMetric) -> Decimal {
        match metric {
            KpiMetric::TotalCustomers => Decimal::from(self.total_customers),
            KpiMetric::AvgPointsBalance => self.avg_points_balance,
            KpiMetric::AvgOrderValue => self.avg_order_value,
            KpiMetric::PointsEarned => Decimal::from(self.points_earned),
            KpiMetric::PointsRedeemed => Decimal::from(self.points_redeemed),
            KpiMetric::RetentionRate => self.retention_rate,
            KpiMetric::AvgClv => self.avg_clv,
            KpiMetric::ActiveCampaigns => Decimal::from(self.active_campaigns),
        }
    }
}

const fn card<M>(
    metric: M,
    title: &'static str,
    mode: DeltaMode,
    format: ValueFormat,
    change_unit: ChangeUnit,
    icon: &'static str,
    color: &'static str,
) -> CardSpec<M> {
    CardSpec {
        metric,
        title,
        mode,
        hints: DisplayHints { format, change_unit, icon, color },
    }
}

use ChangeUnit::{Percent as PctChange, Units};
use DeltaMode::{Absolute, Relative};
use ValueFormat::{Count, Currency, Number, Percent};

pub const KPI_LAYOUT: [CardSpec<KpiMetric>; 8] = [
    card(KpiMetric::TotalCustomers, "Total Customers", Relative, Count, PctChange, "Users", "blue"),
    card(KpiMetric::AvgPointsBalance, "Average Points Balance", Relative, Number, PctChange, "Gift", "green"),
    card(KpiMetric::AvgOrderValue, "Average Order Value", Relative, Currency, PctChange, "DollarSign", "yellow"),
    card(KpiMetric::PointsEarned, "Points Earned", Relative, Count, PctChange, "TrendingUp", "cyan"),
    card(KpiMetric::PointsRedeemed, "Points Redeemed", Relative, Count, PctChange, "Award", "purple"),
    // Already a percentage: the change is in percentage points.
    card(KpiMetric::RetentionRate, "Retention Rate", Absolute, Percent, PctChange, "Percent", "teal"),
    card(KpiMetric::AvgClv, "Average CLV", Relative, Currency, PctChange, "DollarSign", "orange"),
    card(KpiMetric::ActiveCampaigns, "Active Campaigns", Absolute, Count, Units, "Megaphone", "blue"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementMetric {
    AvgNps,
    ReferralRate,
    AvgChurnRisk,
    RepeatPurchaseRate,
}

impl MetricSource<EngagementMetric> for EngagementSnapshot {
    fn metric(&self, metric: EngagementMetric) -> Decimal {
        match metric {
            EngagementMetric::AvgNps => self.avg_nps,
            EngagementMetric::ReferralRate => self.referral_rate,
            EngagementMetric::AvgChurnRisk => self.avg_churn_risk_pct,
            EngagementMetric::RepeatPurchaseRate => self.repeat_purchase_rate,
        }
    }
}

pub const ENGAGEMENT_LAYOUT: [CardSpec<EngagementMetric>; 4] = [
    card(EngagementMetric::AvgNps, "Average NPS Score", Relative, Number, PctChange, "Smile", "green"),
    card(EngagementMetric::ReferralRate, "Referral Rate", Absolute, Percent, PctChange, "Share2", "blue"),
    card(EngagementMetric::AvgChurnRisk, "Average Churn Risk", Relative, Percent, PctChange, "AlertTriangle", "red"),
    card(EngagementMetric::RepeatPurchaseRate, "Repeat Purchase Rate", Absolute, Percent, PctChange, "Repeat", "purple"),
];

/// Compares `current` with `prior` metric by metric and renders the cards in
/// layout order. A comparison that overflows fails the whole board.
pub fn build_cards<M, S>(
    presenter: &Presenter,
    layout: &[CardSpec<M>],
    current: &S,
    prior: &S,
) -> Result<Vec<DisplayRecord>, AnalyticsError>
where
    M: Copy,
    S: MetricSource<M>,
{
    layout
        .iter()
        .map(|spec| {
            let comparison = compare_with(spec.mode, current.metric(spec.metric), prior.metric(spec.metric))?;
            Ok(presenter.present(spec.title, &comparison, &spec.hints))
        })
        .collect()
}

pub fn build_kpi_cards(
    presenter: &Presenter,
    current: &KpiSnapshot,
    prior: &KpiSnapshot,
) -> Result<Vec<DisplayRecord>, AnalyticsError> {
    build_cards(presenter, &KPI_LAYOUT, current, prior)
}

pub fn build_engagement_cards(
    presenter: &Presenter,
    current: &EngagementSnapshot,
    prior: &EngagementSnapshot,
) -> Result<Vec<DisplayRecord>, AnalyticsError> {
    build_cards(presenter, &ENGAGEMENT_LAYOUT, current, prior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiscal::FiscalPeriod;
    use chrono::NaiveDate;
    use core_types::{DisplayValue, Trend};
    use rust_decimal_macros::dec;

    fn period(m: u32) -> FiscalPeriod {
        let start = NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
        FiscalPeriod { start, end: start }
    }

    fn snapshots() -> (KpiSnapshot, KpiSnapshot) {
        let mut current = KpiSnapshot::new(period(4));
        current.total_customers = 10;
        current.avg_points_balance = dec!(150);
        current.avg_order_value = dec!(100);
        current.points_earned = 500;
        current.points_redeemed = 0;
        current.retention_rate = dec!(60);
        current.avg_clv = dec!(250.555);
        current.active_campaigns = 2;

        let mut prior = current.clone();
        prior.period = period(1);
        prior.points_earned = 400;
        prior.points_redeemed = 100;
        prior.retention_rate = dec!(50);
        prior.avg_clv = dec!(0);
        (current, prior)
    }

    #[test]
    fn kpi_cards_follow_layout_order() {
        let (current, prior) = snapshots();
        let cards = build_kpi_cards(&Presenter::default(), &current, &prior).unwrap();
        let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            [
                "Total Customers",
                "Average Points Balance",
                "Average Order Value",
                "Points Earned",
                "Points Redeemed",
                "Retention Rate",
                "Average CLV",
                "Active Campaigns",
            ]
        );
    }

    #[test]
    fn kpi_cards_render_values_and_changes() {
        let (current, prior) = snapshots();
        let cards = build_kpi_cards(&Presenter::default(), &current, &prior).unwrap();

        assert_eq!(cards[0].value, DisplayValue::Count(10));
        assert_eq!(cards[0].change, "0.00% from last quarter");
        assert_eq!(cards[0].trend, Trend::Neutral);

        assert_eq!(cards[2].value, DisplayValue::Text("$100.00".into()));

        assert_eq!(cards[3].change, "+25.00% from last quarter");
        assert_eq!(cards[3].trend, Trend::Up);

        assert_eq!(cards[4].change, "-100.00% from last quarter");
        assert_eq!(cards[4].trend, Trend::Down);

        assert_eq!(cards[5].value, DisplayValue::Text("60.00%".into()));
        assert_eq!(cards[5].change, "+10.00% from last quarter");

        assert_eq!(cards[6].value, DisplayValue::Text("$250.56".into()));
        assert_eq!(cards[6].change, "+100.00% from last quarter");

        assert_eq!(cards[7].value, DisplayValue::Count(2));
        assert_eq!(cards[7].change, "0 from last quarter");
        assert_eq!(cards[7].trend, Trend::Neutral);
    }

    #[test]
    fn engagement_cards() {
        let mut current = EngagementSnapshot::new(period(4));
        current.avg_nps = dec!(8);
        current.referral_rate = dec!(20);
        current.avg_churn_risk_pct = dec!(15);
        current.repeat_purchase_rate = dec!(30);
        let mut prior = EngagementSnapshot::new(period(1));
        prior.avg_nps = dec!(10);
        prior.referral_rate = dec!(25);
        prior.avg_churn_risk_pct = dec!(15);
        prior.repeat_purchase_rate = dec!(30);

        let cards = build_engagement_cards(&Presenter::default(), &current, &prior).unwrap();

        assert_eq!(cards.len(), 4);
        assert_eq!(cards[0].value, DisplayValue::Number(dec!(8)));
        assert_eq!(cards[0].change, "-20.00% from last quarter");
        assert_eq!(cards[1].change, "-5.00% from last quarter");
        assert_eq!(cards[1].trend, Trend::Down);
        assert_eq!(cards[2].value, DisplayValue::Text("15.00%".into()));
        assert_eq!(cards[2].trend, Trend::Neutral);
        assert_eq!(cards[3].title, "Repeat Purchase Rate");
    }

    #[test]
    fn overflowing_comparison_fails_the_board() {
        let (mut current, mut prior) = snapshots();
        current.avg_order_value = Decimal::MAX;
        prior.avg_order_value = dec!(0.0001);

        let err = build_kpi_cards(&Presenter::default(), &current, &prior).unwrap_err();
        assert!(matches!(err, AnalyticsError::Overflow(_)));
    }
}
