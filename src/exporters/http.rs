use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::registry::Registers;

pub const METRICS_PATH: &str = "/metrics";

/// Content type of the Prometheus text exposition format.
const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Router serving the registers on `GET /metrics`.
pub fn router(registers: Arc<Registers>) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(registers)
}

/// Renders whatever the registers currently hold; never waits on the sampler.
async fn metrics_handler(State(registers): State<Arc<Registers>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, TEXT_FORMAT)], registers.render())
}
