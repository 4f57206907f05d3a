use crate::{AppState, error::AppError};
use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use configuration::AuthSettings;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "x-api-key";
/// Browsers cannot set headers on a WebSocket handshake, so the key may also
/// travel as a query parameter.
pub const API_KEY_QUERY: &str = "api_key";

/// Decides whether a request may reach the dashboard handlers.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, credential: Option<&str>) -> bool;
}

/// Lets every request through.
#[derive(Debug, Default)]
pub struct AllowAll;

impl Authenticator for AllowAll {
    fn authenticate(&self, _credential: Option<&str>) -> bool {
        true
    }
}

/// Accepts requests that present one of the configured keys.
#[derive(Debug)]
pub struct ApiKeyAuthenticator {
    keys: HashSet<String>,
}

impl ApiKeyAuthenticator {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        Self { keys: keys.into_iter().collect() }
    }
}

impl Authenticator for ApiKeyAuthenticator {
    fn authenticate(&self, credential: Option<&str>) -> bool {
        credential.is_some_and(|key| self.keys.contains(key))
    }
}

/// An `ApiKeyAuthenticator` when keys are configured, `AllowAll` otherwise.
pub fn from_settings(settings: &AuthSettings) -> Arc<dyn Authenticator> {
    let keys: Vec<String> = settings
        .api_keys
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    if keys.is_empty() {
        tracing::warn!("No API keys configured: dashboard endpoints are unauthenticated");
        Arc::new(AllowAll)
    } else {
        tracing::info!(keys = keys.len(), "API key authentication enabled");
        Arc::new(ApiKeyAuthenticator::new(keys))
    }
}

/// `X-Api-Key`, then `Authorization: Bearer`, then `?api_key=`.
fn credential(headers: &HeaderMap, query: Option<&HashMap<String, String>>) -> Option<String> {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(key.trim().to_string());
    }
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }
    query.and_then(|q| q.get(API_KEY_QUERY)).cloned()
}

/// Middleware guarding the dashboard routes.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let query = Query::<HashMap<String, String>>::try_from_uri(request.uri()).ok();
    let credential = credential(request.headers(), query.as_ref().map(|q| &q.0));

    if !state.authenticator.authenticate(credential.as_deref()) {
        tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated request");
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}
