use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use roomie_core::AuthGate;
use roomie_db::RoomStore;
use roomie_mcp::{credential_from_headers, RoomieMcpServer, ToolDispatcher};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::health;

/// `/health` is open; everything under `/mcp` needs a valid bearer token first.
pub fn router(dispatcher: ToolDispatcher, store: Arc<dyn RoomStore>) -> Router {
    let gate = dispatcher.gate().clone();
    let server = RoomieMcpServer::new(dispatcher);
    let mcp_service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let mcp = Router::new()
        .nest_service("/mcp", mcp_service)
        .layer(middleware::from_fn_with_state(gate, require_credentials));

    Router::new().merge(health::router(store)).merge(mcp).layer(TraceLayer::new_for_http())
}

async fn require_credentials(
    State(gate): State<AuthGate>,
    request: Request,
    next: Next,
) -> Response {
    let credential = credential_from_headers(request.headers());
    match gate.authorize(&credential) {
        Ok(_) => next.run(request).await,
        Err(rejection) => {
            warn!(
                event_name = "http.auth.rejected",
                correlation_id = "ingress",
                path = %request.uri().path(),
                reason = %rejection,
                "rejected unauthenticated mcp request"
            );
            let body = Json(json!({ "error": "unauthorized", "detail": rejection.to_string() }));
            (StatusCode::UNAUTHORIZED, body).into_response()
        }
    }
}
