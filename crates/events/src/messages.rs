use crate::error::EventsError;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::DisplayRecord;
use serde::{Deserialize, Serialize};

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A freshly computed KPI board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiUpdate {
    pub timestamp: DateTime<Utc>,
    pub current_period: PeriodRange,
    pub prior_period: PeriodRange,
    pub cards: Vec<DisplayRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// The top-level WebSocket message enum.
/// All communication from the server to the client will be one of these variants.
///
/// Serialized as `{"type": "Kpis", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WsMessage {
    /// A simple message to confirm to a new client that its WebSocket connection is active.
    Connected,
    /// The KPI cards of the current fiscal quarter.
    Kpis(KpiUpdate),
    /// A failed refresh. The connection stays open.
    Error(ErrorMessage),
}

impl WsMessage {
    pub fn error(message: impl Into<String>) -> Self {
        WsMessage::Error(ErrorMessage { timestamp: Utc::now(), message: message.into() })
    }

    pub fn to_json(&self) -> Result<String, EventsError> {
        Ok(serde_json::to_string(self)?)
    }
}
