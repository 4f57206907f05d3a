//! Shared vocabulary of the loyalty dashboard: the rows read from the store and
//! the display records handed to the front-end.

pub mod display;
pub mod enums;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use display::{DisplayRecord, DisplayValue};
pub use enums::{CampaignStatus, Tier, TransactionType, Trend};
pub use structs::{
    Campaign, CampaignParticipant, Customer, CustomerProfile, Feedback, MlPrediction, Order,
    PointsTransaction, Promotion, Referral, Reward, RewardRecommendation, Segment, SegmentMember,
};
