use crate::enums::{CampaignStatus, Tier, TransactionType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A loyalty-programme member (`users` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub tier: Tier,
    pub points_balance: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total: Decimal,
    /// Pre-tax amount. Older rows leave it empty.
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    pub date: DateTime<Utc>,
}

impl Order {
    /// The amount counted as a sale: the subtotal, or the total when no
    /// subtotal was recorded.
    pub fn sale_amount(&self) -> Decimal {
        self.subtotal.unwrap_or(self.total)
    }
}

/// Contact details and counters of a member, as shown to staff and on the
/// customer list. `Customer` carries only what the KPI boards need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub tier: Tier,
    pub points_balance: i64,
    #[serde(default)]
    pub points_earned: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

/// A points ledger entry (`transactions` table). Positive `points` are earned,
/// negative `points` are redeemed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsTransaction {
    pub id: Uuid,
    pub customer_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub points: i64,
    /// Purchase amount behind the entry, when there was one.
    #[serde(default)]
    pub amount: Option<Decimal>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub context: Option<String>,
}

impl PointsTransaction {
    pub fn is_earn(&self) -> bool {
        self.points > 0
    }

    pub fn is_redeem(&self) -> bool {
        self.points < 0
    }

    /// The reward a redemption was for. Redemptions record it as the last
    /// word of their context, e.g. `"Redeemed reward <id>"`.
    pub fn redeemed_reward(&self) -> Option<&str> {
        if self.kind != TransactionType::RedeemPoints {
            return None;
        }
        self.context.as_deref()?.split_whitespace().last()
    }
}

/// Output of the CLV / churn model. A customer may have several; the one with
/// the latest `prediction_date` is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlPrediction {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub clv_predicted: Decimal,
    #[serde(default)]
    pub churn_probability: Option<Decimal>,
    pub prediction_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub status: CampaignStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Free-form eligibility rules, kept as the stored JSON.
    #[serde(default)]
    pub rules: Option<Value>,
    #[serde(default)]
    pub points_issued: i64,
    #[serde(default)]
    pub total_revenue: Option<Decimal>,
}

impl Campaign {
    pub fn is_active(&self) -> bool {
        self.status == CampaignStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    #[serde(default)]
    pub reward_points: i64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A survey answer carrying a Net Promoter Score (0-10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub nps_score: i32,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: Uuid,
    pub name: String,
    pub points_cost: i64,
}

/// Links a model prediction to the reward it recommends (`pred_rew` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecommendation {
    pub ml_prediction_id: Uuid,
    pub reward_id: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub name: String,
}

/// Membership of a customer in a segment (`user_segments` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMember {
    pub segment_id: Uuid,
    pub customer_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignParticipant {
    pub campaign_id: Uuid,
    pub customer_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

/// A marketing message sent to members (`promotions` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(default)]
    pub sent_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub target_tier: Option<Tier>,
}
