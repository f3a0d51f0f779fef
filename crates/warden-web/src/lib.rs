//! Warden web front end.
//!
//! Serves the polling protocol (`/poll`), the message endpoints (`/msg`,
//! `/msg_sync`), a health check (`/ok`), and optionally a static webui.
//! All state lives in the injected [`SupervisorContext`]; this crate holds
//! nothing of its own.

pub mod routes;

use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use warden_core::{Agent, SupervisorContext};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Supervision context (event log + streaming state).
    pub ctx: Arc<SupervisorContext>,
    /// The agent messages are dispatched to.
    pub agent: Arc<dyn Agent>,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Path to the static webui (served with an `index.html` fallback).
    pub webui_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            webui_dir: None,
        }
    }
}

/// Builds the application router.
pub fn create_app(config: &Config, state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(routes::api_routes(state)).layer(cors);

    if let Some(ref webui_dir) = config.webui_dir {
        if webui_dir.exists() {
            app = app.fallback_service(
                tower_http::services::ServeDir::new(webui_dir).not_found_service(
                    tower_http::services::ServeFile::new(webui_dir.join("index.html")),
                ),
            );
        }
    }

    app
}

/// Binds and runs the server until the process exits.
pub async fn serve(config: Config, state: AppState) -> std::io::Result<()> {
    let app = create_app(&config, state);
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("warden web front end listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use warden_core::LoopbackAgent;

    fn test_state() -> AppState {
        AppState {
            ctx: Arc::new(SupervisorContext::new()),
            agent: Arc::new(LoopbackAgent::default()),
        }
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let app = create_app(&Config::default(), test_state());

        let response = app
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn cors_preflight_is_permitted() {
        let app = create_app(&Config::default(), test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/poll")
                    .header("Origin", "http://localhost:5173")
                    .header("Access-Control-Request-Method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }
}
