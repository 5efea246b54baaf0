use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use roomie_db::RoomStore;
use serde::Serialize;
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    store: Arc<dyn RoomStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub store: HealthCheck,
    pub checked_at: String,
}

pub fn router(store: Arc<dyn RoomStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let store = store_check(state.store.as_ref()).await;
    let ready = store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "roomie-server accepting requests".to_string(),
        },
        store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(store: &dyn RoomStore) -> HealthCheck {
    match store.ping().await {
        Ok(()) => HealthCheck { status: "ready", detail: "room store reachable".to_string() },
        Err(error) => {
            warn!(
                event_name = "system.health.store_unreachable",
                correlation_id = "health",
                error = %error,
                "room store ping failed"
            );
            HealthCheck { status: "degraded", detail: format!("room store ping failed: {error}") }
        }
    }
}
