use serde::{Deserialize, Serialize};

/// Loyalty tier of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    /// All tiers, lowest first. Chart series are emitted in this order.
    pub const ALL: [Tier; 3] = [Tier::Bronze, Tier::Silver, Tier::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
        }
    }
}

/// The kind of a points ledger entry. The sign of the entry's `points`
/// distinguishes earning from redeeming; the kind only labels it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    EarnPoints,
    // Staff redemptions are written as plain "redeem".
    #[serde(alias = "redeem")]
    RedeemPoints,
    WelcomeBonus,
    BirthdayBonus,
    Referral,
    Adjustment,
}

impl TransactionType {
    pub const ALL: [TransactionType; 6] = [
        TransactionType::EarnPoints,
        TransactionType::RedeemPoints,
        TransactionType::WelcomeBonus,
        TransactionType::BirthdayBonus,
        TransactionType::Referral,
        TransactionType::Adjustment,
    ];

    /// The stored label, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::EarnPoints => "earn_points",
            TransactionType::RedeemPoints => "redeem_points",
            TransactionType::WelcomeBonus => "welcome_bonus",
            TransactionType::BirthdayBonus => "birthday_bonus",
            TransactionType::Referral => "referral",
            TransactionType::Adjustment => "adjustment",
        }
    }

    /// Parses a stored label, ignoring case. Accepts the legacy `redeem`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("redeem") {
            return Some(TransactionType::RedeemPoints);
        }
        Self::ALL.into_iter().find(|kind| kind.as_str().eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Inactive,
    Scheduled,
    Completed,
    #[serde(other)]
    Other,
}

/// Direction of a period-over-period change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Neutral => "neutral",
        }
    }
}
