use crate::{AppState, error::AppError};
use analytics::catalog::{CampaignSummary, PromotionView, RewardUsage, TopReward};
use analytics::charts::{ChartRange, DashboardCharts};
use analytics::customers::{CustomerLookup, CustomerOverview};
use analytics::ledger::{DEFAULT_LEDGER_DAYS, LedgerKind, TransactionLog};
use analytics::parse_reference_instant;
use analytics::recommend::Recommendation;
use analytics::segments::GroupSummary;
use axum::{
    Json,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use core_types::DisplayRecord;
use events::{KpiUpdate, PeriodRange, WsMessage};
use reporting::{Grouping, TransactionFilter};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// `?at=` override of the reference instant.
#[derive(Debug, Default, Deserialize)]
pub struct AtQuery {
    pub at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub at: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `?by=segment` (default) or `?by=tier`.
#[derive(Debug, Default, Deserialize)]
pub struct SegmentQuery {
    pub by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Look-back in days; `0` lists everything.
    pub date_range: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    pub search: Option<String>,
}

/// Parses an optional instant, treating a blank value as absent.
fn optional_instant(value: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Ok(Some(parse_reference_instant(v)?)),
        None => Ok(None),
    }
}

fn reference_instant(at: Option<&str>) -> Result<DateTime<Utc>, AppError> {
    Ok(optional_instant(at)?.unwrap_or_else(Utc::now))
}

/// # GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    state.reporter.health().await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// # GET /dashboard/kpis
pub async fn get_kpis(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AtQuery>,
) -> Result<Json<Vec<DisplayRecord>>, AppError> {
    let board = state.reporter.kpis(reference_instant(query.at.as_deref())?).await?;
    Ok(Json(board.cards))
}

/// # GET /dashboard/kpis/additional
pub async fn get_engagement_kpis(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AtQuery>,
) -> Result<Json<Vec<DisplayRecord>>, AppError> {
    let board = state.reporter.engagement_kpis(reference_instant(query.at.as_deref())?).await?;
    Ok(Json(board.cards))
}

/// # GET /dashboard/charts
pub async fn get_charts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<DashboardCharts>, AppError> {
    let reference = reference_instant(query.at.as_deref())?;
    let range = ChartRange {
        start: optional_instant(query.start_date.as_deref())?,
        end: optional_instant(query.end_date.as_deref())?,
    };
    let charts = state.reporter.charts(reference, range).await?;
    Ok(Json(charts))
}

/// # GET /dashboard/recommendations
pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Recommendation>>, AppError> {
    Ok(Json(state.reporter.recommendations().await?))
}

/// # GET /dashboard/segments
pub async fn get_segments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SegmentQuery>,
) -> Result<Json<Vec<GroupSummary>>, AppError> {
    let grouping = match query.by.as_deref().map(str::trim) {
        None | Some("") | Some("segment") => Grouping::Segment,
        Some("tier") => Grouping::Tier,
        Some(other) => return Err(AppError::InvalidInput(format!("Unknown grouping '{other}'"))),
    };
    Ok(Json(state.reporter.groups(grouping, Utc::now()).await?))
}

/// # GET /rewards
pub async fn get_rewards(State(state): State<Arc<AppState>>) -> Result<Json<Vec<RewardUsage>>, AppError> {
    Ok(Json(state.reporter.rewards().await?))
}

/// # GET /dashboard/top-rewards
pub async fn get_top_rewards(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TopReward>>, AppError> {
    Ok(Json(state.reporter.top_rewards().await?))
}

/// # GET /dashboard/customers
pub async fn get_customers(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CustomerOverview>>, AppError> {
    Ok(Json(state.reporter.customers(Utc::now()).await?))
}

/// # GET /transactions
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<TransactionLog>, AppError> {
    let days = query.date_range.unwrap_or(DEFAULT_LEDGER_DAYS);
    if days < 0 {
        return Err(AppError::InvalidInput("date_range must not be negative".to_string()));
    }
    let filter = TransactionFilter {
        search: query.search,
        kind: query.kind.as_deref().unwrap_or_default().parse::<LedgerKind>()?,
        days,
    };
    Ok(Json(state.reporter.transactions(&filter, Utc::now()).await?))
}

/// # GET /campaigns
pub async fn get_campaigns(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CampaignSummary>>, AppError> {
    Ok(Json(state.reporter.campaigns().await?))
}

/// # GET /promotions
pub async fn get_promotions(State(state): State<Arc<AppState>>) -> Result<Json<Vec<PromotionView>>, AppError> {
    Ok(Json(state.reporter.promotions(Utc::now()).await?))
}

/// # GET /staff/customer-lookup
/// Finds a customer by email or phone.
pub async fn customer_lookup(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<CustomerLookup>, AppError> {
    let term = query.search.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(AppError::InvalidInput("Search term is required".to_string()));
    }
    match state.reporter.customer_lookup(term, Utc::now()).await? {
        Some(customer) => Ok(Json(customer)),
        None => Err(AppError::NotFound("Customer not found".to_string())),
    }
}

/// # GET /ws/dashboard/kpis
/// The live KPI feed.
pub async fn kpi_feed(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    tracing::info!("[WS] New client connected.");
    if send(&mut socket, &WsMessage::Connected).await.is_err() {
        return;
    }
    if send(&mut socket, &kpi_message(&state).await).await.is_err() {
        return;
    }

    let mut ticker = state.push_interval.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    loop {
        let push = tokio::select! {
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => text.trim().eq_ignore_ascii_case("refresh"),
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("[WS] Client disconnected.");
                    break;
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "[WS] Error.");
                    break;
                }
                Some(Ok(_)) => false,
            },
            _ = next_tick(&mut ticker) => true,
        };

        if push && send(&mut socket, &kpi_message(&state).await).await.is_err() {
            break;
        }
    }
    tracing::info!("[WS] Connection closed.");
}

/// Waits for the next periodic push, or forever when pushes are disabled.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// A fresh KPI board, or the error that prevented it.
async fn kpi_message(state: &AppState) -> WsMessage {
    match state.reporter.kpis(Utc::now()).await {
        Ok(board) => WsMessage::Kpis(KpiUpdate {
            timestamp: Utc::now(),
            current_period: PeriodRange { start: board.window.current.start, end: board.window.current.end },
            prior_period: PeriodRange { start: board.window.prior.start, end: board.window.prior.end },
            cards: board.cards,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "[WS] KPI refresh failed.");
            WsMessage::error(e.to_string())
        }
    }
}

async fn send(socket: &mut WebSocket, message: &WsMessage) -> Result<(), axum::Error> {
    match message.to_json() {
        Ok(text) => socket.send(Message::Text(text)).await,
        Err(e) => {
            tracing::error!(error = %e, "[WS] Failed to encode message.");
            Ok(())
        }
    }
}
