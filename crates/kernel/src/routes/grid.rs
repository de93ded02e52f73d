//! Property grid routes.
//!
//! Query-string endpoints for the existing grid UI plus JSON endpoints for
//! typed clients. Both decode into the same `GridRequest`.

use axum::{
    Router,
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};

use crate::error::AppResult;
use crate::grid::{EXPORT_CONTENT_TYPE, GridParams, GridRequest, GridResponse};
use crate::state::AppState;

/// Create the grid router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/properties/grid-sale", get(grid_sale))
        .route("/properties/grid-sale/query", post(grid_sale_query))
        .route(
            "/properties/grid-sale/excel",
            get(export_sale).post(export_sale_query),
        )
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

async fn grid_sale(
    State(state): State<AppState>,
    Query(params): Query<GridParams>,
) -> AppResult<Json<GridResponse>> {
    run_grid(&state, params.into_request()).await
}

async fn grid_sale_query(
    State(state): State<AppState>,
    Json(request): Json<GridRequest>,
) -> AppResult<Json<GridResponse>> {
    run_grid(&state, request).await
}

async fn export_sale(State(state): State<AppState>, Query(params): Query<GridParams>) -> Response {
    run_export(&state, &params.into_request())
}

async fn export_sale_query(
    State(state): State<AppState>,
    Json(request): Json<GridRequest>,
) -> Response {
    run_export(&state, &request)
}

// -------------------------------------------------------------------------
// Helpers
// -------------------------------------------------------------------------

async fn run_grid(state: &AppState, request: GridRequest) -> AppResult<Json<GridResponse>> {
    state.metrics().record_grid_request("grid");
    let response = state.grid().grid(&request).await?;
    Ok(Json(response))
}

/// Start a streamed export. Headers go out before the first row is read, so
/// store failures surface as an aborted body rather than an error status.
fn run_export(state: &AppState, request: &GridRequest) -> Response {
    state.metrics().record_grid_request("export");
    let disposition = format!(
        "attachment; filename=\"{}\"",
        state.grid().export_filename()
    );

    (
        [
            (header::CONTENT_TYPE, EXPORT_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(state.grid().export(request)),
    )
        .into_response()
}
