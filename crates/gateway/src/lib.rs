//! WhatsApp webhook gateway for kabot.
//!
//! Exposes the messaging webhook, a manual memory-migration trigger and a
//! health check. Built on Axum.

use axum::extract::{DefaultBodyLimit, Query};
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use kabot_agent::{ClosureOutcome, Orchestrator};
use kabot_core::message::UserKey;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/webhook/whatsapp", post(whatsapp_handler))
        .route("/debug/migrate-memory", post(migrate_memory_handler))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: kabot_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let orchestrator = Arc::new(Orchestrator::from_config(&config).await?);
    let app = build_router(Arc::new(GatewayState { orchestrator }));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("Could not listen for Ctrl-C; shutting down");
            }
            info!("Gateway shutting down");
        })
        .await?;

    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Form fields posted by the WhatsApp messaging provider.
#[derive(Deserialize)]
struct WhatsAppForm {
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "From")]
    from: String,
}

/// Answer one inbound WhatsApp message with a plain-text reply.
///
/// A failed turn still answers 200 with the configured apology.
async fn whatsapp_handler(
    State(state): State<SharedState>,
    Form(form): Form<WhatsAppForm>,
) -> Response {
    let user = UserKey::from_whatsapp_sender(&form.from);
    if user.as_str().is_empty() {
        warn!(from = %form.from, "Webhook sender has no usable number");
        return (StatusCode::BAD_REQUEST, "missing sender").into_response();
    }

    info!(user = %user, "Inbound WhatsApp message");
    let reply = state.orchestrator.reply(&user, form.body.trim()).await;
    (StatusCode::OK, reply).into_response()
}

#[derive(Deserialize)]
struct MigrateParams {
    user_id: String,
}

/// Run the closure pipeline for one user on demand.
async fn migrate_memory_handler(
    State(state): State<SharedState>,
    Query(params): Query<MigrateParams>,
) -> Response {
    let user = UserKey::new(params.user_id.trim());
    if user.as_str().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "user_id is required" })),
        )
            .into_response();
    }

    match state.orchestrator.close(&user).await {
        Ok(outcome) => {
            let message = match outcome {
                ClosureOutcome::NothingToClose => {
                    format!("No working memory for {user}; nothing to migrate")
                }
                ClosureOutcome::Cleared => format!("Working memory for {user} held no content and was cleared"),
                ClosureOutcome::Consolidated { messages } => {
                    format!("Migrated {messages} messages for {user}")
                }
            };
            Json(serde_json::json!({ "message": message })).into_response()
        }
        Err(e) => {
            warn!(user = %user, error = %e, "Memory migration failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use kabot_agent::test_helpers::{SequentialMockProvider, sample_vehicles};
    use kabot_agent::{CatalogSearch, Collaborators, LlmGateway};
    use kabot_config::{MemoryConfig, OrchestratorConfig};
    use kabot_core::memory::MemoryTier;
    use kabot_core::message::Message;
    use kabot_memory::Stores;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state(replies: &[&str]) -> SharedState {
        let provider = Arc::new(SequentialMockProvider::replies(replies.iter().copied()));
        let gateway = LlmGateway::new(provider, "mock-model");
        let stores = Stores::in_memory(&MemoryConfig::default(), Duration::from_secs(1));
        let collaborators = Collaborators::prompt_backed(
            gateway.clone(),
            Arc::new(CatalogSearch::new(sample_vehicles())),
        );
        let orchestrator = Orchestrator::new(
            gateway,
            stores,
            collaborators,
            &OrchestratorConfig::default(),
        );
        Arc::new(GatewayState {
            orchestrator: Arc::new(orchestrator),
        })
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn webhook(form: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook/whatsapp")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(&[]));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn webhook_replies_and_keys_by_number() {
        let state = test_state(&[r#"{"intention":"none","response":"¡Hola!"}"#]);
        let app = build_router(state.clone());

        let response = app
            .oneshot(webhook("Body=Hola&From=whatsapp%3A%2B5215512345678"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "¡Hola!");

        let working = state
            .orchestrator
            .stores()
            .working
            .load(&UserKey::from("5215512345678"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(working, vec![Message::user("Hola"), Message::assistant("¡Hola!")]);
    }

    #[tokio::test]
    async fn webhook_failure_still_answers_with_apology() {
        let app = build_router(test_state(&[]));
        let response = app
            .oneshot(webhook("Body=Hola&From=whatsapp%3A%2B5215512345678"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, OrchestratorConfig::default().error_reply);
    }

    #[tokio::test]
    async fn webhook_without_sender_is_rejected() {
        let app = build_router(test_state(&[]));
        let response = app.oneshot(webhook("Body=Hola&From=")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn migrate_memory_with_nothing_to_close() {
        let app = build_router(test_state(&[]));
        let req = Request::builder()
            .method("POST")
            .uri("/debug/migrate-memory?user_id=521555")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("nothing to migrate"));
    }

    #[tokio::test]
    async fn migrate_memory_consolidates_working_memory() {
        let state = test_state(&["Ana saluda.", r#"{"nombre": "Ana"}"#]);
        let user = UserKey::from("521555");
        let stores = state.orchestrator.stores();
        stores
            .working
            .store(&user, vec![Message::user("Soy Ana"), Message::assistant("Hola Ana")])
            .await
            .unwrap();

        let req = Request::builder()
            .method("POST")
            .uri("/debug/migrate-memory?user_id=521555")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Migrated 2 messages"));

        assert!(stores.working.load(&user).await.unwrap().is_none());
        assert_eq!(stores.facts.load(&user).await.unwrap().unwrap()["nombre"], "Ana");
    }

    #[tokio::test]
    async fn migrate_memory_failure_reports_error() {
        let state = test_state(&[]);
        let user = UserKey::from("521555");
        state
            .orchestrator
            .stores()
            .working
            .store(&user, vec![Message::user("Hola")])
            .await
            .unwrap();

        let req = Request::builder()
            .method("POST")
            .uri("/debug/migrate-memory?user_id=521555")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("\"error\""));
    }
}
