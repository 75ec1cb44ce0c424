use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use space_surfer::types::ConnectionState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    feed_state: ConnectionState,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        feed_state: state.engine.feed_status().state,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}
