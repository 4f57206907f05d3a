//! # Loyalty Events
//!
//! This crate defines the real-time message structures used for WebSocket
//! communication between the insights service and the dashboard UI.
//!
//! It depends only on `core-types` and provides the definitive language for
//! the live KPI feed.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{ErrorMessage, KpiUpdate, PeriodRange, WsMessage};
