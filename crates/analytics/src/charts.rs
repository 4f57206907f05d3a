//! Chart series of the dashboard.
//!
//! Monthly series cover the trailing calendar months ending with the month of
//! the reference instant, oldest first.

use crate::catalog::{participant_counts, redemption_counts};
use crate::error::AnalyticsError;
use crate::present::round2;
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use core_types::{
    Campaign, CampaignParticipant, Customer, Order, PointsTransaction, Referral, Reward, Segment, SegmentMember, Tier,
    TransactionType,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

pub const DEFAULT_CHART_MONTHS: u32 = 12;

/// Slice colors of the segment chart, reused in order when there are more segments.
pub const SEGMENT_COLORS: [&str; 5] = ["#34D399", "#EF4444", "#3B82F6", "#A855F7", "#F59E0B"];

/// One calendar month, `[start, next_start)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    pub label: String,
    pub start: DateTime<Utc>,
    pub next_start: DateTime<Utc>,
}

impl MonthBucket {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.next_start
    }
}

/// Optional inclusive bounds on the rows counted by `transactionsByType`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ChartRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| instant >= s) && self.end.is_none_or(|e| instant <= e)
    }
}

/// Rows the charts are computed from. Nothing here is period-scoped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartInputs<'a> {
    pub customers: &'a [Customer],
    pub orders: &'a [Order],
    pub transactions: &'a [PointsTransaction],
    pub referrals: &'a [Referral],
    pub segments: &'a [Segment],
    pub members: &'a [SegmentMember],
    pub rewards: &'a [Reward],
    pub campaigns: &'a [Campaign],
    pub participants: &'a [CampaignParticipant],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointsActivity {
    pub labels: Vec<String>,
    pub earned: Vec<i64>,
    pub redeemed: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series<T> {
    pub labels: Vec<String>,
    pub data: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColoredSeries {
    pub labels: Vec<String>,
    pub data: Vec<i64>,
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardScore {
    pub name: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCharts {
    pub points_activity: PointsActivity,
    pub total_sales_over_time: MultiSeries,
    pub tier_distribution: Series<i64>,
    pub transactions_by_type: Series<i64>,
    pub customer_engagement_by_tier: Series<f64>,
    pub customer_segments: ColoredSeries,
    pub reward_popularity: Vec<RewardScore>,
    pub campaign_engagement: Series<i64>,
    pub campaign_participation_over_time: MultiSeries,
}

/// Builds `count` month buckets ending with the month of `reference`.
pub fn trailing_months(reference: DateTime<Utc>, count: u32) -> Result<Vec<MonthBucket>, AnalyticsError> {
    let anchor = NaiveDate::from_ymd_opt(reference.year(), reference.month(), 1)
        .ok_or_else(|| AnalyticsError::DateOutOfRange("chart months".into()))?;

    (0..count)
        .rev()
        .map(|back| {
            let start = anchor
                .checked_sub_months(Months::new(back))
                .ok_or_else(|| AnalyticsError::DateOutOfRange("chart months".into()))?;
            let next = start
                .checked_add_months(Months::new(1))
                .ok_or_else(|| AnalyticsError::DateOutOfRange("chart months".into()))?;
            Ok(MonthBucket {
                label: start.format("%b %Y").to_string(),
                start: start.and_time(NaiveTime::MIN).and_utc(),
                next_start: next.and_time(NaiveTime::MIN).and_utc(),
            })
        })
        .collect()
}

/// Builds every chart series for one reference instant.
#[derive(Debug, Clone)]
pub struct ChartBuilder {
    months: u32,
}

impl Default for ChartBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CHART_MONTHS)
    }
}

impl ChartBuilder {
    pub fn new(months: u32) -> Self {
        Self { months: months.max(1) }
    }

    pub fn build(
        &self,
        reference: DateTime<Utc>,
        range: ChartRange,
        inputs: ChartInputs<'_>,
    ) -> Result<DashboardCharts, AnalyticsError> {
        let buckets = trailing_months(reference, self.months)?;
        let labels: Vec<String> = buckets.iter().map(|b| b.label.clone()).collect();

        tracing::debug!(months = buckets.len(), "building dashboard charts");

        Ok(DashboardCharts {
            points_activity: points_activity(&buckets, inputs.transactions),
            total_sales_over_time: MultiSeries {
                labels: labels.clone(),
                datasets: vec![Dataset {
                    label: "Total Sales".to_string(),
                    data: sales_by_month(&buckets, inputs.orders),
                }],
            },
            tier_distribution: tier_distribution(inputs.customers),
            transactions_by_type: transactions_by_type(range, inputs.transactions, inputs.referrals),
            customer_engagement_by_tier: engagement_by_tier(inputs.customers, inputs.transactions),
            customer_segments: customer_segments(inputs.segments, inputs.members),
            reward_popularity: reward_popularity(inputs.rewards, inputs.transactions),
            campaign_engagement: campaign_engagement(inputs.campaigns, inputs.participants),
            campaign_participation_over_time: MultiSeries {
                labels,
                datasets: participation_by_month(&buckets, inputs.campaigns, inputs.participants),
            },
        })
    }
}

fn points_activity(buckets: &[MonthBucket], transactions: &[PointsTransaction]) -> PointsActivity {
    let mut earned = vec![0i64; buckets.len()];
    let mut redeemed = vec![0i64; buckets.len()];

    for t in transactions {
        let Some(idx) = buckets.iter().position(|b| b.contains(t.date)) else {
            continue;
        };
        match t.kind {
            TransactionType::EarnPoints | TransactionType::WelcomeBonus if t.points > 0 => {
                earned[idx] += t.points;
            }
            TransactionType::RedeemPoints if t.points < 0 => redeemed[idx] += t.points.abs(),
            _ => {}
        }
    }

    PointsActivity {
        labels: buckets.iter().map(|b| b.label.clone()).collect(),
        earned,
        redeemed,
    }
}

fn sales_by_month(buckets: &[MonthBucket], orders: &[Order]) -> Vec<f64> {
    let mut totals = vec![Decimal::ZERO; buckets.len()];
    for order in orders {
        if let Some(idx) = buckets.iter().position(|b| b.contains(order.date)) {
            totals[idx] += order.sale_amount();
        }
    }
    totals.into_iter().map(to_chart_number).collect()
}

fn tier_distribution(customers: &[Customer]) -> Series<i64> {
    Series {
        labels: Tier::ALL.iter().map(|t| t.as_str().to_string()).collect(),
        data: Tier::ALL
            .iter()
            .map(|tier| customers.iter().filter(|c| c.tier == *tier).count() as i64)
            .collect(),
    }
}

fn transactions_by_type(
    range: ChartRange,
    transactions: &[PointsTransaction],
    referrals: &[Referral],
) -> Series<i64> {
    let (mut earned, mut redeemed, mut welcome) = (0i64, 0i64, 0i64);
    for t in transactions.iter().filter(|t| range.contains(t.date)) {
        match t.kind {
            TransactionType::EarnPoints if t.points > 0 => earned += t.points,
            TransactionType::RedeemPoints if t.points < 0 => redeemed += t.points.abs(),
            TransactionType::WelcomeBonus if t.points > 0 => welcome += t.points,
            _ => {}
        }
    }
    let referral: i64 = referrals
        .iter()
        .filter(|r| range.contains(r.date))
        .map(|r| r.reward_points)
        .sum();

    Series {
        labels: ["Earned", "Redeemed", "Welcome", "Referral"].map(String::from).to_vec(),
        data: vec![earned, redeemed, welcome, referral],
    }
}

/// Positive points earned by a tier's customers divided by the tier's size.
fn engagement_by_tier(customers: &[Customer], transactions: &[PointsTransaction]) -> Series<f64> {
    let tier_of: HashMap<Uuid, Tier> = customers.iter().map(|c| (c.id, c.tier)).collect();
    let mut points: HashMap<Tier, i64> = HashMap::new();
    for t in transactions.iter().filter(|t| t.points > 0) {
        if let Some(tier) = tier_of.get(&t.customer_id) {
            *points.entry(*tier).or_default() += t.points;
        }
    }

    let data = Tier::ALL
        .iter()
        .map(|tier| {
            let members = customers.iter().filter(|c| c.tier == *tier).count();
            if members == 0 {
                return 0.0;
            }
            let total = Decimal::from(points.get(tier).copied().unwrap_or_default());
            to_chart_number(total / Decimal::from(members))
        })
        .collect();

    Series {
        labels: Tier::ALL.iter().map(|t| t.as_str().to_string()).collect(),
        data,
    }
}

/// Member count of every segment, in segment order.
fn customer_segments(segments: &[Segment], members: &[SegmentMember]) -> ColoredSeries {
    let mut counts: HashMap<Uuid, i64> = HashMap::new();
    for member in members {
        *counts.entry(member.segment_id).or_default() += 1;
    }

    ColoredSeries {
        labels: segments.iter().map(|s| s.name.clone()).collect(),
        data: segments.iter().map(|s| counts.get(&s.id).copied().unwrap_or_default()).collect(),
        colors: SEGMENT_COLORS.iter().cycle().take(segments.len()).map(|c| c.to_string()).collect(),
    }
}

fn reward_popularity(rewards: &[Reward], transactions: &[PointsTransaction]) -> Vec<RewardScore> {
    let counts = redemption_counts(transactions);
    rewards
        .iter()
        .map(|r| RewardScore {
            name: r.name.clone(),
            score: counts.get(&r.id).copied().unwrap_or_default(),
        })
        .collect()
}

fn campaign_engagement(campaigns: &[Campaign], participants: &[CampaignParticipant]) -> Series<i64> {
    let counts = participant_counts(participants);
    Series {
        labels: campaigns.iter().map(|c| c.name.clone()).collect(),
        data: campaigns.iter().map(|c| counts.get(&c.id).copied().unwrap_or_default()).collect(),
    }
}

/// One dataset per campaign: participants who joined in each month.
fn participation_by_month(
    buckets: &[MonthBucket],
    campaigns: &[Campaign],
    participants: &[CampaignParticipant],
) -> Vec<Dataset> {
    campaigns
        .iter()
        .map(|campaign| {
            let mut joined = vec![0.0; buckets.len()];
            for p in participants.iter().filter(|p| p.campaign_id == campaign.id) {
                if let Some(idx) = buckets.iter().position(|b| b.contains(p.joined_at)) {
                    joined[idx] += 1.0;
                }
            }
            Dataset { label: campaign.name.clone(), data: joined }
        })
        .collect()
}

fn to_chart_number(value: Decimal) -> f64 {
    round2(value).to_f64().unwrap_or_default()
}
