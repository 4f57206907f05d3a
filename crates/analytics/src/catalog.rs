//! Reward, campaign and promotion listings.

use crate::present::round2;
use chrono::{DateTime, Duration, Utc};
use core_types::{Campaign, CampaignParticipant, CampaignStatus, PointsTransaction, Promotion, Reward};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Length of the `top-rewards` list.
pub const TOP_REWARDS: usize = 5;

/// A promotion is shown as running for this long after it was sent.
pub const PROMOTION_RUN_DAYS: i64 = 30;

/// Redemptions per reward. Entries whose context does not end in a reward id
/// are not counted.
pub fn redemption_counts(transactions: &[PointsTransaction]) -> HashMap<Uuid, i64> {
    let mut counts: HashMap<Uuid, i64> = HashMap::new();
    for t in transactions {
        let Some(token) = t.redeemed_reward() else {
            continue;
        };
        match Uuid::parse_str(token) {
            Ok(reward) => *counts.entry(reward).or_default() += 1,
            Err(_) => tracing::debug!(transaction = %t.id, token, "Redemption context names no reward"),
        }
    }
    counts
}

/// One row of the reward catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardUsage {
    pub id: Uuid,
    pub name: String,
    pub points: i64,
    pub redemption_count: i64,
}

/// Every reward with its redemption count, in catalog order.
pub fn reward_usage(rewards: &[Reward], transactions: &[PointsTransaction]) -> Vec<RewardUsage> {
    let counts = redemption_counts(transactions);
    rewards
        .iter()
        .map(|r| RewardUsage {
            id: r.id,
            name: r.name.clone(),
            points: r.points_cost,
            redemption_count: counts.get(&r.id).copied().unwrap_or_default(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopReward {
    pub name: String,
    pub redemptions: i64,
    pub points: i64,
}

/// The `limit` most redeemed rewards, most redeemed first. Ties keep catalog
/// order.
pub fn top_rewards(rewards: &[Reward], transactions: &[PointsTransaction], limit: usize) -> Vec<TopReward> {
    let mut ranked: Vec<TopReward> = reward_usage(rewards, transactions)
        .into_iter()
        .map(|r| TopReward { name: r.name, redemptions: r.redemption_count, points: r.points })
        .collect();
    ranked.sort_by(|a, b| b.redemptions.cmp(&a.redemptions));
    ranked.truncate(limit);
    ranked
}

/// Participants per campaign.
pub fn participant_counts(participants: &[CampaignParticipant]) -> HashMap<Uuid, i64> {
    let mut counts: HashMap<Uuid, i64> = HashMap::new();
    for p in participants {
        *counts.entry(p.campaign_id).or_default() += 1;
    }
    counts
}

/// One row of the campaign list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: CampaignStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub rules: Option<Value>,
    pub participants: i64,
    pub points_issued: i64,
    /// Two decimals; zero when no revenue was recorded.
    #[serde(rename = "total_revenue", with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
}

pub fn campaign_summaries(campaigns: &[Campaign], participants: &[CampaignParticipant]) -> Vec<CampaignSummary> {
    let counts = participant_counts(participants);
    campaigns
        .iter()
        .map(|c| CampaignSummary {
            id: c.id,
            name: c.name.clone(),
            kind: c.kind.clone(),
            status: c.status,
            start_date: c.start_date,
            end_date: c.end_date,
            rules: c.rules.clone(),
            participants: counts.get(&c.id).copied().unwrap_or_default(),
            points_issued: c.points_issued,
            total_revenue: round2(c.total_revenue.unwrap_or_default()),
        })
        .collect()
}

/// One row of the promotion list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionView {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: DateTime<Utc>,
    pub description: String,
}

/// Promotions as listed on the dashboard. An unsent promotion is shown as if
/// sent at `now`.
pub fn promotion_listing(promotions: &[Promotion], now: DateTime<Utc>) -> Vec<PromotionView> {
    promotions
        .iter()
        .map(|p| PromotionView {
            id: p.id,
            name: p.title.clone(),
            kind: p.kind.clone(),
            status: p.status.clone(),
            start_date: p.sent_date,
            end_date: p.sent_date.unwrap_or(now) + Duration::days(PROMOTION_RUN_DAYS),
            description: p
                .message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_description(p)),
        })
        .collect()
}

/// `"Discount for Gold customers"`, `"Bonus for all customers"`.
fn default_description(promotion: &Promotion) -> String {
    let mut chars = promotion.kind.chars();
    let kind: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::from("Promotion"),
    };
    let audience = promotion.target_tier.map_or("all", |t| t.as_str());
    format!("{kind} for {audience} customers")
}
