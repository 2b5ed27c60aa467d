//! Prometheus scrape handler

use crate::api::rest::state::AppState;
use crate::config::CollectMode;
use crate::error::ApiResult;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use mongostat_collector::metrics::TEXT_CONTENT_TYPE;

/// Handler for GET /metrics
pub async fn scrape_metrics(State(state): State<AppState>) -> ApiResult<Response> {
    if state.mode == CollectMode::OnScrape {
        state.cycle.run_once().await;
    }

    let body = state.cycle.metrics().export()?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response())
}
