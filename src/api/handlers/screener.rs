use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::StockMetricSnapshot;
use crate::screener::{Screener, ScreenerCriteria, ScreenerRequest};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub criteria: ScreenerRequest,
    /// Screens the configured snapshot source when absent.
    pub snapshots: Option<Vec<StockMetricSnapshot>>,
}

#[derive(Serialize)]
pub struct RunResponse {
    pub filters: Vec<&'static str>,
    pub total: usize,
    pub count: usize,
    pub results: Vec<StockMetricSnapshot>,
}

/// POST /api/screener/run — filter snapshots by the posted criteria
pub async fn run(
    State(state): State<AppState>,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RunResponse>>, AppError> {
    let Json(body) = body?;

    let criteria = ScreenerCriteria::try_from(body.criteria)?;
    // Build before fetching so bad criteria never touch the source.
    let screener = Screener::new(&criteria)?;

    let snapshots = match body.snapshots {
        Some(snapshots) => snapshots,
        None => state.snapshots.fetch_snapshots().await?,
    };

    let results = crate::screener::run(&snapshots, &criteria)?;

    Ok(Json(ApiResponse::ok(RunResponse {
        filters: screener.filters().iter().map(|f| f.name()).collect(),
        total: snapshots.len(),
        count: results.len(),
        results,
    })))
}
