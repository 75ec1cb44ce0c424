//! Game state and control endpoints.

use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use space_surfer::error::{AppError, Result};
use space_surfer::types::{GameAction, GameSnapshot, Instrument};
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentsResponse {
    instruments: Vec<Instrument>,
    selected: Instrument,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionResponse {
    accepted: bool,
    state: GameSnapshot,
}

/// GET /api/game/state
async fn get_state(State(state): State<AppState>) -> Json<GameSnapshot> {
    Json(state.engine.snapshot())
}

/// GET /api/game/instruments
async fn get_instruments(State(state): State<AppState>) -> Json<InstrumentsResponse> {
    Json(InstrumentsResponse {
        instruments: Instrument::all(),
        selected: state.engine.snapshot().instrument,
    })
}

/// POST /api/game/action
///
/// The body is decoded by hand so that unknown actions map to 400.
async fn post_action(State(state): State<AppState>, body: String) -> Result<Json<ActionResponse>> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("missing action body".to_string()));
    }
    let action: GameAction = serde_json::from_str(&body)?;
    debug!("Applying action {:?}", action);

    let accepted = state.engine.apply(action, Instant::now());
    Ok(Json(ActionResponse {
        accepted,
        state: state.engine.snapshot(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/state", get(get_state))
        .route("/instruments", get(get_instruments))
        .route("/action", post(post_action))
}

#[cfg(test)]
mod tests {
    use crate::api::{self, test_support};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        api::router().with_state(test_support::state())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn action(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/game/action")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_state() {
        let request = Request::builder()
            .uri("/api/game/state")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["phase"], "start");
        assert_eq!(json["score"], 0);
        assert_eq!(json["ready"], false);
        assert_eq!(json["terrain"]["speed"], 0.0);
        assert_eq!(json["requiredSamples"], 15);
    }

    #[tokio::test]
    async fn test_get_instruments() {
        let request = Request::builder()
            .uri("/api/game/instruments")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["instruments"].as_array().map(|a| a.len()), Some(3));
        assert_eq!(json["selected"]["name"], "BTC");
    }

    #[tokio::test]
    async fn test_post_begin_action() {
        let (status, json) = send(app(), action(r#"{"type":"begin"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["accepted"], true);
        assert_eq!(json["state"]["phase"], "instructions");
    }

    #[tokio::test]
    async fn test_post_enter_before_ready_is_not_accepted() {
        let (status, json) = send(app(), action(r#"{"type":"enter"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["accepted"], false);
        assert_eq!(json["state"]["phase"], "start");
    }

    #[tokio::test]
    async fn test_post_empty_body_is_bad_request() {
        let (status, json) = send(app(), action("")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "missing action body");
    }

    #[tokio::test]
    async fn test_post_unknown_action_is_bad_request() {
        let (status, json) = send(app(), action(r#"{"type":"teleport"}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], 400);
    }
}
