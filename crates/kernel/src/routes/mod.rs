//! HTTP route handlers.

pub mod grid;
pub mod health;
pub mod metrics;

use axum::Router;

use crate::middleware::require_api_token;
use crate::state::AppState;

/// Build the application router.
///
/// The API token gate covers the grid routes only; health and metrics stay
/// open for probes and scrapers.
pub fn app(state: AppState) -> Router {
    let grid = grid::router().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        require_api_token,
    ));

    Router::new()
        .merge(grid)
        .merge(health::router())
        .merge(metrics::router())
        .with_state(state)
}
