use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use coinboard::history::HistoryRecord;
use coinboard::portfolio::PortfolioService;
use coinboard::valuation::PortfolioSnapshot;
use serde::Serialize;
use tower_http::trace::TraceLayer;

/// Body of `GET /api/portfolio`. Both outcomes are sent with `200 OK`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PortfolioResponse {
    Success { data: PortfolioSnapshot },
    Error,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub status: &'static str,
    pub history: Vec<HistoryRecord>,
}

pub fn router(service: Arc<PortfolioService>) -> Router {
    Router::new()
        .route("/api/portfolio", get(portfolio))
        .route("/api/history", get(history))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn portfolio(State(service): State<Arc<PortfolioService>>) -> Json<PortfolioResponse> {
    Json(match service.compute_valuation().await {
        Some(data) => PortfolioResponse::Success { data },
        None => PortfolioResponse::Error,
    })
}

async fn history(State(service): State<Arc<PortfolioService>>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        status: "success",
        history: service.display_history().await,
    })
}
