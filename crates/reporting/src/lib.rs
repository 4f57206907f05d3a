use analytics::catalog::{
    CampaignSummary, PromotionView, RewardUsage, TOP_REWARDS, TopReward, campaign_summaries, promotion_listing,
    reward_usage, top_rewards,
};
use analytics::charts::{ChartBuilder, ChartInputs, ChartRange, DashboardCharts};
use analytics::customers::{CustomerLookup, CustomerOverview, LookupInputs, OverviewInputs, customer_lookup, customer_overview};
use analytics::engine::{AnalyticsEngine, EngagementActivity, PeriodActivity};
use analytics::fiscal::{FiscalCalendar, FiscalPeriod, QuarterWindow};
use analytics::layout::{build_engagement_cards, build_kpi_cards};
use analytics::ledger::{DEFAULT_LEDGER_DAYS, LedgerInputs, LedgerKind, TransactionLog, transaction_log};
use analytics::present::Presenter;
use analytics::recommend::{Recommendation, RecommendationInputs, build_recommendations};
use analytics::segments::{GroupSummary, SegmentInputs, segment_summaries, tier_summaries};
use chrono::{DateTime, Duration, Utc};
use configuration::ReportingSettings;
use core_types::DisplayRecord;
use database::{DbError, DbRepository, LedgerQuery};
use serde::Serialize;

pub mod error;

pub use error::ReportingError;

/// The cards of one board together with the windows they compare.
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub window: QuarterWindow,
    pub cards: Vec<DisplayRecord>,
}

/// How `/dashboard/segments` groups customers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Grouping {
    #[default]
    Segment,
    Tier,
}

/// Filters of the transaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Substring of the customer id.
    pub search: Option<String>,
    pub kind: LedgerKind,
    /// Look-back in days; zero lists every entry.
    pub days: i64,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self { search: None, kind: LedgerKind::All, days: DEFAULT_LEDGER_DAYS }
    }
}

/// Runs one dashboard request end to end.
///
/// Every board follows the same steps:
/// 1. Resolve the fiscal windows of the reference instant.
/// 2. Fetch the rows of both windows concurrently.
/// 3. Reduce each window to a snapshot.
/// 4. Compare the snapshots and render the cards.
///
/// Any fetch failure aborts the request; no partial board is returned.
#[derive(Clone)]
pub struct DashboardReporter {
    repo: DbRepository,
    calendar: FiscalCalendar,
    engine: AnalyticsEngine,
    presenter: Presenter,
    charts: ChartBuilder,
}

impl DashboardReporter {
    pub fn new(repo: DbRepository, settings: &ReportingSettings) -> Result<Self, ReportingError> {
        Ok(Self {
            repo,
            calendar: FiscalCalendar::new(settings.fiscal_year_start_month)?,
            engine: AnalyticsEngine::new(),
            presenter: Presenter::new(&settings.currency_symbol, &settings.comparison_phrase),
            charts: ChartBuilder::new(settings.chart_months),
        })
    }

    pub fn calendar(&self) -> &FiscalCalendar {
        &self.calendar
    }

    /// The main KPI board of the quarter containing `reference`.
    pub async fn kpis(&self, reference: DateTime<Utc>) -> Result<Board, ReportingError> {
        let window = self.calendar.resolve(reference)?;
        tracing::info!(current = %window.current, prior = %window.prior, "Computing KPI board");

        let (customers, campaigns, current, prior) = tokio::try_join!(
            self.repo.customers(),
            self.repo.campaigns(),
            self.period_activity(window.current),
            self.period_activity(window.prior),
        )?;

        let current = self.engine.calculate_kpis(window.current, &customers, &current, &campaigns)?;
        let prior = self.engine.calculate_kpis(window.prior, &customers, &prior, &campaigns)?;
        tracing::debug!(?current, ?prior, "KPI snapshots");

        Ok(Board { window, cards: build_kpi_cards(&self.presenter, &current, &prior)? })
    }

    /// The engagement board (NPS, referrals, churn risk, repeat purchases).
    pub async fn engagement_kpis(&self, reference: DateTime<Utc>) -> Result<Board, ReportingError> {
        let window = self.calendar.resolve(reference)?;
        tracing::info!(current = %window.current, prior = %window.prior, "Computing engagement board");

        let (current, prior) = tokio::try_join!(
            self.engagement_activity(window.current),
            self.engagement_activity(window.prior),
        )?;

        let current = self.engine.calculate_engagement(window.current, &current)?;
        let prior = self.engine.calculate_engagement(window.prior, &prior)?;

        Ok(Board { window, cards: build_engagement_cards(&self.presenter, &current, &prior)? })
    }

    pub async fn charts(
        &self,
        reference: DateTime<Utc>,
        range: ChartRange,
    ) -> Result<DashboardCharts, ReportingError> {
        let (customers, orders, transactions, referrals, segments, members, rewards, campaigns, participants) = tokio::try_join!(
            self.repo.customers(),
            self.repo.all_orders(),
            self.repo.all_transactions(),
            self.repo.all_referrals(),
            self.repo.segments(),
            self.repo.segment_members(),
            self.repo.rewards(),
            self.repo.campaigns(),
            self.repo.campaign_participants(),
        )?;

        let inputs = ChartInputs {
            customers: &customers,
            orders: &orders,
            transactions: &transactions,
            referrals: &referrals,
            segments: &segments,
            members: &members,
            rewards: &rewards,
            campaigns: &campaigns,
            participants: &participants,
        };
        Ok(self.charts.build(reference, range, inputs)?)
    }

    /// Size, spend, points and retention of every segment or tier.
    pub async fn groups(&self, grouping: Grouping, now: DateTime<Utc>) -> Result<Vec<GroupSummary>, ReportingError> {
        let (customers, transactions) = tokio::try_join!(self.repo.customers(), self.repo.all_transactions())?;
        let groups = match grouping {
            Grouping::Tier => tier_summaries(&customers, &transactions, now)?,
            Grouping::Segment => {
                let (segments, members) = tokio::try_join!(self.repo.segments(), self.repo.segment_members())?;
                segment_summaries(
                    SegmentInputs { segments: &segments, members: &members, customers: &customers, transactions: &transactions },
                    now,
                )?
            }
        };
        tracing::debug!(?grouping, count = groups.len(), "Built group summaries");
        Ok(groups)
    }

    pub async fn rewards(&self) -> Result<Vec<RewardUsage>, ReportingError> {
        let (rewards, transactions) = tokio::try_join!(self.repo.rewards(), self.repo.all_transactions())?;
        Ok(reward_usage(&rewards, &transactions))
    }

    pub async fn top_rewards(&self) -> Result<Vec<TopReward>, ReportingError> {
        let (rewards, transactions) = tokio::try_join!(self.repo.rewards(), self.repo.all_transactions())?;
        Ok(top_rewards(&rewards, &transactions, TOP_REWARDS))
    }

    pub async fn customers(&self, now: DateTime<Utc>) -> Result<Vec<CustomerOverview>, ReportingError> {
        let (profiles, transactions, segments, members) = tokio::try_join!(
            self.repo.customer_profiles(),
            self.repo.all_transactions(),
            self.repo.segments(),
            self.repo.segment_members(),
        )?;
        let inputs = OverviewInputs { profiles: &profiles, transactions: &transactions, segments: &segments, members: &members };
        Ok(customer_overview(inputs, now)?)
    }

    /// Ledger entries and referral bonuses, newest first, with their totals.
    pub async fn transactions(
        &self,
        filter: &TransactionFilter,
        now: DateTime<Utc>,
    ) -> Result<TransactionLog, ReportingError> {
        let query = LedgerQuery {
            customer: filter.search.clone().filter(|s| !s.trim().is_empty()),
            since: (filter.days > 0).then(|| now - Duration::days(filter.days)),
        };
        tracing::info!(kind = ?filter.kind, ?query, "Listing transactions");

        let (customers, transactions, referrals) = tokio::try_join!(
            self.repo.customers(),
            async {
                if filter.kind.includes_ledger() { self.repo.ledger(&query).await } else { Ok(Vec::new()) }
            },
            async {
                if filter.kind.includes_referrals() { self.repo.referral_ledger(&query).await } else { Ok(Vec::new()) }
            },
        )?;

        Ok(transaction_log(
            filter.kind,
            LedgerInputs { transactions: &transactions, referrals: &referrals, customers: &customers },
        )?)
    }

    pub async fn campaigns(&self) -> Result<Vec<CampaignSummary>, ReportingError> {
        let (campaigns, participants) = tokio::try_join!(self.repo.campaigns(), self.repo.campaign_participants())?;
        Ok(campaign_summaries(&campaigns, &participants))
    }

    pub async fn promotions(&self, now: DateTime<Utc>) -> Result<Vec<PromotionView>, ReportingError> {
        Ok(promotion_listing(&self.repo.promotions().await?, now))
    }

    /// Finds a customer by email or phone. `None` when nobody matches.
    pub async fn customer_lookup(&self, term: &str, now: DateTime<Utc>) -> Result<Option<CustomerLookup>, ReportingError> {
        let Some(profile) = self.repo.find_customer(term).await? else {
            tracing::info!(term, "No customer matches the lookup");
            return Ok(None);
        };

        let (orders, transactions, predictions) = tokio::try_join!(
            self.repo.orders_of(profile.id),
            self.repo.transactions_of(profile.id),
            self.repo.predictions_of(profile.id),
        )?;
        let inputs = LookupInputs { profile: &profile, orders: &orders, transactions: &transactions, predictions: &predictions };
        Ok(Some(customer_lookup(inputs, now)?))
    }

    pub async fn recommendations(&self) -> Result<Vec<Recommendation>, ReportingError> {
        let (customers, orders, predictions, links, rewards) = tokio::try_join!(
            self.repo.customers(),
            self.repo.all_orders(),
            self.repo.all_predictions(),
            self.repo.reward_recommendations(),
            self.repo.rewards(),
        )?;

        let rows = build_recommendations(
            &self.presenter,
            RecommendationInputs {
                customers: &customers,
                orders: &orders,
                predictions: &predictions,
                links: &links,
                rewards: &rewards,
            },
        );
        tracing::debug!(count = rows.len(), "Built recommendations");
        Ok(rows)
    }

    pub async fn health(&self) -> Result<(), ReportingError> {
        Ok(self.repo.ping().await?)
    }

    async fn period_activity(&self, period: FiscalPeriod) -> Result<PeriodActivity, DbError> {
        let (start, end) = (period.start_instant(), period.end_instant());
        let (orders, transactions, predictions) = tokio::try_join!(
            self.repo.orders_between(start, end),
            self.repo.transactions_between(start, end),
            self.repo.predictions_between(start, end),
        )?;
        Ok(PeriodActivity { orders, transactions, predictions })
    }

    async fn engagement_activity(&self, period: FiscalPeriod) -> Result<EngagementActivity, DbError> {
        let (start, end) = (period.start_instant(), period.end_instant());
        let (feedback, referrals, new_customers, predictions, orders) = tokio::try_join!(
            self.repo.feedback_between(start, end),
            self.repo.referrals_between(start, end),
            self.repo.customers_created_between(start, end),
            self.repo.predictions_between(start, end),
            self.repo.orders_between(start, end),
        )?;
        Ok(EngagementActivity { feedback, referrals, new_customers, predictions, orders })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use analytics::AnalyticsError;
    use core_types::{
        Campaign, CampaignParticipant, CampaignStatus, Customer, CustomerProfile, DisplayValue, Feedback,
        MlPrediction, Order, PointsTransaction, Promotion, Referral, Reward, RewardRecommendation, Segment,
        SegmentMember, Tier, TransactionType, Trend,
    };
    use database::{Entity, MemoryStore};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    fn customer(tier: Tier) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            name: Some("Customer".into()),
            tier,
            points_balance: 100,
            created_at: at(2023, 1, 1),
        }
    }

    fn orders(customer_id: Uuid, count: usize, total: Decimal, date: DateTime<Utc>) -> Vec<Order> {
        (0..count)
            .map(|_| Order { id: Uuid::new_v4(), customer_id, total, subtotal: None, date })
            .collect()
    }

    fn reporter(store: Arc<MemoryStore>) -> DashboardReporter {
        DashboardReporter::new(DbRepository::new(store), &ReportingSettings::default()).unwrap()
    }

    fn card<'a>(board: &'a Board, title: &str) -> &'a DisplayRecord {
        board.cards.iter().find(|c| c.title == title).unwrap()
    }

    #[tokio::test]
    async fn average_order_value_is_flat_across_quarters() {
        let store = Arc::new(MemoryStore::new());
        let buyer = customer(Tier::Silver);
        let mut all = orders(buyer.id, 10, dec!(100), at(2024, 5, 1));
        all.extend(orders(buyer.id, 8, dec!(100), at(2023, 11, 20)));
        // Jan-Mar 2024 is neither window for a May reference.
        all.extend(orders(buyer.id, 3, dec!(999), at(2024, 2, 1)));
        store.insert(Entity::Users, &[buyer]).await.unwrap();
        store.insert(Entity::Orders, &all).await.unwrap();

        let board = reporter(store).kpis(at(2024, 5, 15)).await.unwrap();

        assert_eq!(board.window.current.to_string(), "2024-04-01..2024-06-30");
        assert_eq!(board.window.prior.to_string(), "2023-10-01..2023-12-31");
        assert_eq!(board.cards.len(), 8);

        let aov = card(&board, "Average Order Value");
        assert_eq!(aov.value, DisplayValue::Text("$100.00".into()));
        assert_eq!(aov.change, "0.00% from last quarter");
        assert_eq!(aov.trend, Trend::Neutral);
    }

    #[tokio::test]
    async fn empty_store_yields_zeroed_board() {
        let board = reporter(Arc::new(MemoryStore::new())).kpis(at(2024, 2, 10)).await.unwrap();

        assert_eq!(board.window.current.to_string(), "2024-01-01..2024-03-31");
        assert_eq!(board.window.prior.to_string(), "2023-10-01..2023-12-31");
        for record in &board.cards {
            assert_eq!(record.trend, Trend::Neutral, "{}", record.title);
        }
        assert_eq!(card(&board, "Average CLV").value, DisplayValue::Text("$0.00".into()));
        assert_eq!(card(&board, "Active Campaigns").change, "0 from last quarter");
    }

    #[tokio::test]
    async fn campaigns_and_clv_feed_the_board() {
        let store = Arc::new(MemoryStore::new());
        let a = customer(Tier::Gold);
        let prediction = |clv, date| MlPrediction {
            id: Uuid::new_v4(),
            customer_id: a.id,
            clv_predicted: clv,
            churn_probability: Some(dec!(0.2)),
            prediction_date: date,
        };
        let campaign = |status| Campaign {
            id: Uuid::new_v4(),
            name: "Promo".into(),
            kind: None,
            status,
            start_date: None,
            end_date: None,
            rules: None,
            points_issued: 0,
            total_revenue: None,
        };
        store.insert(Entity::Users, std::slice::from_ref(&a)).await.unwrap();
        store
            .insert(Entity::MlPredictions, &[prediction(dec!(300), at(2024, 4, 10)), prediction(dec!(200), at(2023, 12, 1))])
            .await
            .unwrap();
        store
            .insert(Entity::Campaigns, &[campaign(CampaignStatus::Active), campaign(CampaignStatus::Completed)])
            .await
            .unwrap();

        let board = reporter(store).kpis(at(2024, 5, 15)).await.unwrap();

        let clv = card(&board, "Average CLV");
        assert_eq!(clv.value, DisplayValue::Text("$300.00".into()));
        assert_eq!(clv.change, "+50.00% from last quarter");
        assert_eq!(clv.trend, Trend::Up);
        assert_eq!(card(&board, "Active Campaigns").value, DisplayValue::Count(1));
    }

    #[tokio::test]
    async fn fetch_failure_aborts_the_request() {
        let store = Arc::new(MemoryStore::new());
        store.set_failure(Some("relation \"orders\" does not exist")).await;
        let reporter = reporter(store);

        let err = reporter.kpis(at(2024, 5, 15)).await.unwrap_err();
        assert!(matches!(err, ReportingError::Database(_)));
        assert!(err.to_string().contains("relation \"orders\" does not exist"));
        assert!(reporter.health().await.is_err());
    }

    #[tokio::test]
    async fn engagement_board() {
        let store = Arc::new(MemoryStore::new());
        let mut newcomer = customer(Tier::Bronze);
        newcomer.created_at = at(2024, 4, 20);
        let feedback = |score, date| Feedback { id: Uuid::new_v4(), nps_score: score, date };
        store.insert(Entity::Users, std::slice::from_ref(&newcomer)).await.unwrap();
        store
            .insert(Entity::Feedback, &[feedback(9, at(2024, 4, 2)), feedback(7, at(2024, 6, 2)), feedback(4, at(2023, 10, 2))])
            .await
            .unwrap();
        store
            .insert(
                Entity::Referrals,
                &[Referral { id: Uuid::new_v4(), referrer_id: newcomer.id, reward_points: 100, date: at(2024, 5, 2), status: None }],
            )
            .await
            .unwrap();

        let board = reporter(store).engagement_kpis(at(2024, 5, 15)).await.unwrap();

        let titles: Vec<&str> = board.cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Average NPS Score", "Referral Rate", "Average Churn Risk", "Repeat Purchase Rate"]);
        assert_eq!(board.cards[0].value, DisplayValue::Number(dec!(8)));
        assert_eq!(board.cards[0].change, "+100.00% from last quarter");
        assert_eq!(board.cards[1].value, DisplayValue::Text("100.00%".into()));
        assert_eq!(board.cards[1].change, "+100.00% from last quarter");
    }

    #[tokio::test]
    async fn recommendations_and_charts() {
        let store = Arc::new(MemoryStore::new());
        let a = customer(Tier::Gold);
        let prediction = MlPrediction {
            id: Uuid::new_v4(),
            customer_id: a.id,
            clv_predicted: dec!(450),
            churn_probability: None,
            prediction_date: at(2024, 3, 1),
        };
        let reward = Reward { id: Uuid::new_v4(), name: "Lounge Pass".into(), points_cost: 900 };
        store.insert(Entity::Users, std::slice::from_ref(&a)).await.unwrap();
        store.insert(Entity::Orders, &orders(a.id, 2, dec!(60), at(2024, 5, 3))).await.unwrap();
        store.insert(Entity::MlPredictions, std::slice::from_ref(&prediction)).await.unwrap();
        store.insert(Entity::Rewards, std::slice::from_ref(&reward)).await.unwrap();
        store
            .insert(
                Entity::PredRew,
                &[RewardRecommendation { ml_prediction_id: prediction.id, reward_id: reward.id, reason: None }],
            )
            .await
            .unwrap();
        let reporter = reporter(store);

        let rows = reporter.recommendations().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].clv, "$120.00");
        assert_eq!(rows[0].predicted_clv, "$450.00");
        assert_eq!(rows[0].recommended_reward, "Lounge Pass");
        assert_eq!(rows[0].reason, "No reason provided");

        let charts = reporter.charts(at(2024, 5, 15), ChartRange::default()).await.unwrap();
        assert_eq!(charts.total_sales_over_time.labels.len(), 12);
        assert_eq!(charts.total_sales_over_time.labels.last().map(String::as_str), Some("May 2024"));
        assert_eq!(charts.total_sales_over_time.datasets[0].data.last(), Some(&120.0));
        assert_eq!(charts.tier_distribution.data, [0, 0, 1]);
    }

    #[tokio::test]
    async fn overflowing_sums_fail_the_board() {
        let store = Arc::new(MemoryStore::new());
        let buyer = customer(Tier::Gold);
        store.insert(Entity::Orders, &orders(buyer.id, 2, Decimal::MAX, at(2024, 5, 1))).await.unwrap();
        store.insert(Entity::Users, &[buyer]).await.unwrap();

        let err = reporter(store).kpis(at(2024, 5, 15)).await.unwrap_err();
        assert!(matches!(err, ReportingError::Analytics(AnalyticsError::Overflow(_))));
    }

    fn entry(customer_id: Uuid, kind: TransactionType, points: i64, amount: Decimal, date: DateTime<Utc>) -> PointsTransaction {
        PointsTransaction { id: Uuid::new_v4(), customer_id, kind, points, amount: Some(amount), date, context: None }
    }

    fn profile(name: &str, email: &str, phone: &str, tier: Tier, points_balance: i64) -> CustomerProfile {
        CustomerProfile {
            id: Uuid::new_v4(),
            name: Some(name.into()),
            email: Some(email.into()),
            phone: Some(phone.into()),
            tier,
            points_balance,
            points_earned: None,
            created_at: at(2023, 1, 1),
            last_activity: None,
        }
    }

    #[tokio::test]
    async fn groups_by_segment_or_tier() {
        let store = Arc::new(MemoryStore::new());
        let ada = profile("Ada", "ada@example.com", "555-0101", Tier::Gold, 300);
        let bob = profile("Bob", "bob@example.com", "555-0102", Tier::Gold, 100);
        let vip = Segment { id: Uuid::new_v4(), name: "VIP".into() };
        store.insert(Entity::Users, &[ada.clone(), bob.clone()]).await.unwrap();
        store.insert(Entity::Segments, std::slice::from_ref(&vip)).await.unwrap();
        store
            .insert(
                Entity::UserSegments,
                &[SegmentMember { segment_id: vip.id, customer_id: ada.id }, SegmentMember { segment_id: vip.id, customer_id: bob.id }],
            )
            .await
            .unwrap();
        store
            .insert(
                Entity::Transactions,
                &[
                    entry(ada.id, TransactionType::EarnPoints, 40, dec!(40), at(2024, 5, 1)),
                    entry(bob.id, TransactionType::EarnPoints, 20, dec!(20), at(2023, 1, 5)),
                ],
            )
            .await
            .unwrap();
        let reporter = reporter(store);
        let now = at(2024, 5, 15);

        let segments = reporter.groups(Grouping::Segment, now).await.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id, Some(vip.id));
        assert_eq!(segments[0].count, 2);
        assert_eq!(segments[0].avg_spend, dec!(30));
        assert_eq!(segments[0].avg_points, dec!(200));
        assert_eq!(segments[0].retention_rate, dec!(50));

        let tiers = reporter.groups(Grouping::Tier, now).await.unwrap();
        let names: Vec<&str> = tiers.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Bronze", "Silver", "Gold"]);
        assert_eq!(tiers[2].count, 2);
        assert_eq!(tiers[0].retention_rate, dec!(50));
    }

    #[tokio::test]
    async fn reward_catalog_and_top_rewards() {
        let store = Arc::new(MemoryStore::new());
        let coffee = Reward { id: Uuid::new_v4(), name: "Free Coffee".into(), points_cost: 100 };
        let lounge = Reward { id: Uuid::new_v4(), name: "Lounge Pass".into(), points_cost: 900 };
        let customer_id = Uuid::new_v4();
        let mut redemption = entry(customer_id, TransactionType::RedeemPoints, -900, Decimal::ZERO, at(2024, 5, 1));
        redemption.context = Some(format!("Redeemed reward {}", lounge.id));
        store.insert(Entity::Rewards, &[coffee, lounge]).await.unwrap();
        store.insert(Entity::Transactions, &[redemption]).await.unwrap();
        let reporter = reporter(store);

        let catalog = reporter.rewards().await.unwrap();
        let counts: Vec<(&str, i64)> = catalog.iter().map(|r| (r.name.as_str(), r.redemption_count)).collect();
        assert_eq!(counts, [("Free Coffee", 0), ("Lounge Pass", 1)]);

        let top = reporter.top_rewards().await.unwrap();
        assert_eq!(top[0].name, "Lounge Pass");
        assert_eq!(top[0].redemptions, 1);
        assert_eq!(top[0].points, 900);
    }

    #[tokio::test]
    async fn customer_list_reports_spend_and_activity() {
        let store = Arc::new(MemoryStore::new());
        let ada = profile("Ada", "ada@example.com", "555-0101", Tier::Silver, 250);
        let quiet = profile("Quiet", "quiet@example.com", "555-0199", Tier::Bronze, 0);
        store.insert(Entity::Users, &[ada.clone(), quiet.clone()]).await.unwrap();
        store
            .insert(
                Entity::Transactions,
                &[
                    entry(ada.id, TransactionType::EarnPoints, 50, dec!(50), at(2024, 5, 1)),
                    entry(ada.id, TransactionType::EarnPoints, 25, dec!(25.5), at(2023, 6, 1)),
                ],
            )
            .await
            .unwrap();
        let now = at(2024, 5, 15);

        let rows = reporter(store).customers(now).await.unwrap();

        assert_eq!(rows.len(), 2);
        let ada_row = rows.iter().find(|r| r.id == ada.id).unwrap();
        assert_eq!(ada_row.spend, dec!(75.5));
        assert_eq!(ada_row.last_activity, at(2024, 5, 1));
        assert_eq!(ada_row.retention_rate, dec!(50));
        assert_eq!(ada_row.churn_risk, dec!(50));
        assert_eq!(ada_row.segment, "Unknown");
        let quiet_row = rows.iter().find(|r| r.id == quiet.id).unwrap();
        assert_eq!(quiet_row.last_activity, now);
        assert_eq!(quiet_row.churn_risk, dec!(50));
    }

    #[tokio::test]
    async fn transaction_log_honors_search_type_and_range() {
        let store = Arc::new(MemoryStore::new());
        let ada = customer(Tier::Gold);
        let bob = customer(Tier::Bronze);
        store.insert(Entity::Users, &[ada.clone(), bob.clone()]).await.unwrap();
        store
            .insert(
                Entity::Transactions,
                &[
                    entry(ada.id, TransactionType::EarnPoints, 100, dec!(100), at(2024, 5, 1)),
                    entry(ada.id, TransactionType::RedeemPoints, -40, Decimal::ZERO, at(2024, 5, 2)),
                    entry(ada.id, TransactionType::EarnPoints, 70, dec!(70), at(2023, 1, 1)),
                    entry(bob.id, TransactionType::EarnPoints, 10, dec!(10), at(2024, 5, 3)),
                ],
            )
            .await
            .unwrap();
        store
            .insert(
                Entity::Referrals,
                &[Referral { id: Uuid::new_v4(), referrer_id: ada.id, reward_points: 100, date: at(2024, 5, 4), status: None }],
            )
            .await
            .unwrap();
        let reporter = reporter(store);
        let now = at(2024, 5, 15);

        let everything = reporter.transactions(&TransactionFilter { days: 0, ..Default::default() }, now).await.unwrap();
        assert_eq!(everything.stats.total_transactions, 5);

        let filter = TransactionFilter { search: Some(ada.id.to_string()[..8].to_string()), days: 90, ..Default::default() };
        let recent = reporter.transactions(&filter, now).await.unwrap();
        let kinds: Vec<&str> = recent.transactions.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, ["referral", "redeem_points", "earn_points"]);
        assert_eq!(recent.stats.total_points, 160);
        assert_eq!(recent.stats.total_value, dec!(100));

        let redeemed = TransactionFilter { kind: "redeem".parse().unwrap(), ..Default::default() };
        let log = reporter.transactions(&redeemed, now).await.unwrap();
        assert_eq!(log.stats.total_transactions, 1);
        assert_eq!(log.transactions[0].points, -40);
    }

    #[tokio::test]
    async fn campaigns_and_promotions_are_listed() {
        let store = Arc::new(MemoryStore::new());
        let campaign = Campaign {
            id: Uuid::new_v4(),
            name: "Spring".into(),
            kind: Some("points_multiplier".into()),
            status: CampaignStatus::Active,
            start_date: Some(at(2024, 3, 1)),
            end_date: None,
            rules: Some(serde_json::json!({ "multiplier": 2 })),
            points_issued: 1200,
            total_revenue: Some(dec!(999.999)),
        };
        let promotion = Promotion {
            id: Uuid::new_v4(),
            title: "Gold weekend".into(),
            message: None,
            kind: "discount".into(),
            status: "sent".into(),
            sent_date: Some(at(2024, 5, 1)),
            target_tier: Some(Tier::Gold),
        };
        store.insert(Entity::Campaigns, std::slice::from_ref(&campaign)).await.unwrap();
        store
            .insert(
                Entity::CampaignParticipants,
                &[CampaignParticipant { campaign_id: campaign.id, customer_id: Uuid::new_v4(), joined_at: at(2024, 3, 2) }],
            )
            .await
            .unwrap();
        store.insert(Entity::Promotions, &[promotion]).await.unwrap();
        let reporter = reporter(store);

        let campaigns = reporter.campaigns().await.unwrap();
        assert_eq!(campaigns.len(), 1);
        assert_eq!(campaigns[0].participants, 1);
        assert_eq!(campaigns[0].points_issued, 1200);
        assert_eq!(campaigns[0].total_revenue, dec!(1000.00));
        assert_eq!(campaigns[0].rules, Some(serde_json::json!({ "multiplier": 2 })));

        let promotions = reporter.promotions(at(2024, 5, 15)).await.unwrap();
        assert_eq!(promotions[0].name, "Gold weekend");
        assert_eq!(promotions[0].description, "Discount for Gold customers");
        assert_eq!(promotions[0].end_date, at(2024, 5, 31));

        let charts = reporter.charts(at(2024, 5, 15), ChartRange::default()).await.unwrap();
        assert_eq!(charts.campaign_engagement.data, [1]);
    }

    #[tokio::test]
    async fn customer_lookup_by_email_or_phone() {
        let store = Arc::new(MemoryStore::new());
        let ada = profile("Ada", "ada@example.com", "555-0101", Tier::Bronze, 400);
        store.insert(Entity::Users, std::slice::from_ref(&ada)).await.unwrap();
        store.insert(Entity::Orders, &orders(ada.id, 3, dec!(20), at(2024, 5, 5))).await.unwrap();
        store.insert(Entity::Orders, &orders(Uuid::new_v4(), 1, dec!(500), at(2024, 5, 5))).await.unwrap();
        store
            .insert(Entity::Transactions, &[entry(ada.id, TransactionType::EarnPoints, 60, dec!(60), at(2024, 5, 5))])
            .await
            .unwrap();
        let reporter = reporter(store);
        let now = at(2024, 5, 15);

        let found = reporter.customer_lookup("ADA@example", now).await.unwrap().unwrap();
        assert_eq!(found.id, ada.id);
        assert_eq!(found.total_spend, dec!(60));
        assert_eq!(found.rfm.frequency, 3);
        assert_eq!(found.rfm.recency, 10);
        assert_eq!(found.points_earned, 60);
        assert_eq!(found.churn_probability, dec!(0.1));
        assert_eq!(found.tier_progress.points_to_next, 600);

        assert_eq!(reporter.customer_lookup("0101", now).await.unwrap().map(|c| c.id), Some(ada.id));
        assert!(reporter.customer_lookup("nobody@example.com", now).await.unwrap().is_none());
    }
}
