//! Per-segment and per-tier customer summaries.

use crate::engine::{add, percentage, ratio};
use crate::error::AnalyticsError;
use crate::present::round2;
use chrono::{DateTime, Duration, Utc};
use core_types::{Customer, PointsTransaction, Segment, SegmentMember, Tier};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// A customer with ledger activity this recent counts as retained.
pub const ACTIVE_WINDOW_DAYS: i64 = 90;

/// Retention reported for a group with no members.
pub const EMPTY_GROUP_RETENTION: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Size, value and retention of one group of customers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    /// Set for segments; tiers have no id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    pub count: i64,
    pub description: String,
    /// Mean positive purchase amount per member.
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_spend: Decimal,
    /// Mean points balance per member.
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_points: Decimal,
    /// Share of members with ledger activity in the active window.
    #[serde(with = "rust_decimal::serde::float")]
    pub retention_rate: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct SegmentInputs<'a> {
    pub segments: &'a [Segment],
    pub members: &'a [SegmentMember],
    pub customers: &'a [Customer],
    pub transactions: &'a [PointsTransaction],
}

/// One summary per segment, in segment order.
pub fn segment_summaries(inputs: SegmentInputs<'_>, now: DateTime<Utc>) -> Result<Vec<GroupSummary>, AnalyticsError> {
    let balances = balances(inputs.customers);
    let mut members: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    for m in inputs.members {
        members.entry(m.segment_id).or_default().insert(m.customer_id);
    }
    let empty = HashSet::new();

    inputs
        .segments
        .iter()
        .map(|segment| {
            summarize(
                Group {
                    id: Some(segment.id),
                    name: segment.name.clone(),
                    description: format!("{} customers segment", segment.name),
                    members: members.get(&segment.id).unwrap_or(&empty),
                },
                &balances,
                inputs.transactions,
                now,
            )
        })
        .collect()
}

/// One summary per tier, lowest tier first.
pub fn tier_summaries(
    customers: &[Customer],
    transactions: &[PointsTransaction],
    now: DateTime<Utc>,
) -> Result<Vec<GroupSummary>, AnalyticsError> {
    let balances = balances(customers);
    Tier::ALL
        .iter()
        .map(|tier| {
            let members: HashSet<Uuid> = customers.iter().filter(|c| c.tier == *tier).map(|c| c.id).collect();
            summarize(
                Group {
                    id: None,
                    name: tier.as_str().to_string(),
                    description: format!("{} tier customers", tier.as_str()),
                    members: &members,
                },
                &balances,
                transactions,
                now,
            )
        })
        .collect()
}

struct Group<'a> {
    id: Option<Uuid>,
    name: String,
    description: String,
    members: &'a HashSet<Uuid>,
}

fn balances(customers: &[Customer]) -> HashMap<Uuid, i64> {
    customers.iter().map(|c| (c.id, c.points_balance)).collect()
}

fn summarize(
    group: Group<'_>,
    balances: &HashMap<Uuid, i64>,
    transactions: &[PointsTransaction],
    now: DateTime<Utc>,
) -> Result<GroupSummary, AnalyticsError> {
    let since = now - Duration::days(ACTIVE_WINDOW_DAYS);
    let count = Decimal::from(group.members.len());

    let mut spend = Decimal::ZERO;
    let mut active = HashSet::new();
    for t in transactions.iter().filter(|t| group.members.contains(&t.customer_id)) {
        if let Some(amount) = t.amount.filter(|a| *a > Decimal::ZERO) {
            spend = add(spend, amount, "segment spend")?;
        }
        if t.date >= since {
            active.insert(t.customer_id);
        }
    }

    let points = group
        .members
        .iter()
        .filter_map(|id| balances.get(id))
        .try_fold(0i64, |sum, balance| sum.checked_add(*balance))
        .ok_or_else(|| AnalyticsError::Overflow("segment points".into()))?;

    let retention_rate = if group.members.is_empty() {
        EMPTY_GROUP_RETENTION
    } else {
        round2(percentage(Decimal::from(active.len()), count)?)
    };

    Ok(GroupSummary {
        id: group.id,
        name: group.name,
        count: group.members.len() as i64,
        description: group.description,
        avg_spend: round2(ratio(spend, count)?),
        avg_points: round2(ratio(Decimal::from(points), count)?),
        retention_rate,
    })
}
