//! The transaction log: points ledger entries and referral bonuses in one list.

use crate::engine::add;
use crate::error::AnalyticsError;
use crate::present::round2;
use chrono::{DateTime, Utc};
use core_types::{Customer, PointsTransaction, Referral, TransactionType};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

/// Default look-back of the transaction log, about five years.
pub const DEFAULT_LEDGER_DAYS: i64 = 1825;

const COMPLETED: &str = "completed";

/// Which entries the log lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LedgerKind {
    /// Ledger entries and referral bonuses.
    #[default]
    All,
    /// Referral bonuses only.
    Referral,
    /// Ledger entries of one type only.
    Only(TransactionType),
}

impl FromStr for LedgerKind {
    type Err = AnalyticsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            Ok(LedgerKind::All)
        } else if value.eq_ignore_ascii_case("referral") {
            Ok(LedgerKind::Referral)
        } else {
            TransactionType::from_label(value)
                .map(LedgerKind::Only)
                .ok_or_else(|| AnalyticsError::InvalidTransactionType(value.to_string()))
        }
    }
}

impl LedgerKind {
    pub fn includes_ledger(&self) -> bool {
        !matches!(self, LedgerKind::Referral)
    }

    pub fn includes_referrals(&self) -> bool {
        matches!(self, LedgerKind::All | LedgerKind::Referral)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub points: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    pub date: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total_transactions: i64,
    /// Net points moved by the listed entries.
    pub total_points: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionLog {
    pub transactions: Vec<LedgerRow>,
    pub stats: LedgerStats,
}

#[derive(Debug, Clone, Copy)]
pub struct LedgerInputs<'a> {
    pub transactions: &'a [PointsTransaction],
    pub referrals: &'a [Referral],
    /// Used for the customer names only.
    pub customers: &'a [Customer],
}

/// Lists the entries `kind` selects, newest first, with their totals.
pub fn transaction_log(kind: LedgerKind, inputs: LedgerInputs<'_>) -> Result<TransactionLog, AnalyticsError> {
    let names: HashMap<Uuid, &str> = inputs
        .customers
        .iter()
        .filter_map(|c| c.name.as_deref().map(|name| (c.id, name)))
        .collect();
    let name_of = |id: &Uuid| names.get(id).copied().unwrap_or("Unknown").to_string();

    let mut rows = Vec::new();
    if kind.includes_ledger() {
        rows.extend(
            inputs
                .transactions
                .iter()
                .filter(|t| match kind {
                    LedgerKind::Only(only) => t.kind == only,
                    _ => true,
                })
                .map(|t| LedgerRow {
                    id: t.id,
                    customer_id: t.customer_id,
                    customer_name: name_of(&t.customer_id),
                    kind: t.kind.as_str().to_string(),
                    points: t.points,
                    amount: t.amount.unwrap_or_default(),
                    description: t
                        .context
                        .clone()
                        .filter(|c| !c.trim().is_empty())
                        .unwrap_or_else(|| "No description".to_string()),
                    date: t.date,
                    status: COMPLETED.to_string(),
                }),
        );
    }
    if kind.includes_referrals() {
        rows.extend(inputs.referrals.iter().map(|r| LedgerRow {
            id: r.id,
            customer_id: r.referrer_id,
            customer_name: name_of(&r.referrer_id),
            kind: TransactionType::Referral.as_str().to_string(),
            points: r.reward_points,
            amount: Decimal::ZERO,
            description: "Referral bonus".to_string(),
            date: r.date,
            status: r.status.clone().unwrap_or_else(|| COMPLETED.to_string()),
        }));
    }
    rows.sort_by(|a, b| b.date.cmp(&a.date));

    let mut total_points = 0i64;
    let mut total_value = Decimal::ZERO;
    for row in &rows {
        total_points = total_points
            .checked_add(row.points)
            .ok_or_else(|| AnalyticsError::Overflow("ledger points".into()))?;
        total_value = add(total_value, row.amount, "ledger value")?;
    }

    Ok(TransactionLog {
        stats: LedgerStats {
            total_transactions: rows.len() as i64,
            total_points,
            total_value: round2(total_value),
        },
        transactions: rows,
    })
}
