//! # Loyalty Analytics
//!
//! Pure reporting logic for the loyalty dashboard. Nothing in this crate
//! performs I/O: callers fetch rows and hand them in as slices.
//!
//! - `fiscal`: fiscal quarter boundaries and the comparison window.
//! - `engine`: reduces the rows of one period to a snapshot of metrics.
//! - `compare` / `present`: period-over-period deltas and their display form.
//! - `layout`: the fixed card order of the KPI boards.
//! - `charts`, `recommend`: the non-comparative dashboard views.
//! - `segments`, `customers`, `catalog`, `ledger`: the read-only list views
//!   (groups, customer overview and lookup, rewards and campaigns, the
//!   transaction log).

pub mod catalog;
pub mod charts;
pub mod compare;
pub mod customers;
pub mod engine;
pub mod error;
pub mod fiscal;
pub mod layout;
pub mod ledger;
pub mod present;
pub mod recommend;
pub mod report;
pub mod segments;

pub use catalog::{CampaignSummary, PromotionView, RewardUsage, TopReward};
pub use charts::{ChartBuilder, ChartInputs, ChartRange, DashboardCharts};
pub use compare::{Comparison, DeltaMode, compare, compare_absolute, compare_with};
pub use customers::{CustomerLookup, CustomerOverview, LookupInputs, OverviewInputs};
pub use engine::{AnalyticsEngine, EngagementActivity, PeriodActivity};
pub use error::AnalyticsError;
pub use fiscal::{FiscalCalendar, FiscalPeriod, FiscalQuarter, QuarterWindow, parse_reference_instant};
pub use layout::{build_engagement_cards, build_kpi_cards};
pub use ledger::{LedgerInputs, LedgerKind, TransactionLog};
pub use present::Presenter;
pub use recommend::{Recommendation, RecommendationInputs, build_recommendations};
pub use report::{EngagementSnapshot, KpiSnapshot};
pub use segments::{GroupSummary, SegmentInputs};
