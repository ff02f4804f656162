//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router whose fallback feeds every request to the
//!   pipeline
//! - Wire up middleware (tracing, request ID, timeout, Server header)
//! - Buffer request bodies up to the configured limit
//! - Serve until the shutdown channel fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request as AxumRequest, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::request::Request;
use crate::pipeline::Application;

/// Value of the `Server` response header.
pub const SERVER_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// State injected into the fallback handler.
#[derive(Clone)]
struct AppState {
    app: Arc<Application>,
    max_body_bytes: usize,
}

/// HTTP front end of an [`Application`].
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServiceConfig, app: Arc<Application>) -> Self {
        let state = AppState {
            app,
            max_body_bytes: config.listener.max_body_bytes,
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        Router::new()
            .fallback(pipeline_handler)
            .with_state(state)
            .layer(SetResponseHeaderLayer::if_not_present(
                header::SERVER,
                HeaderValue::from_static(SERVER_NAME),
            ))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for in-process use (e.g. `tower::ServiceExt::oneshot`).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffer the body and hand the request to the pipeline.
async fn pipeline_handler(State(state): State<AppState>, request: AxumRequest) -> AxumResponse {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = state.max_body_bytes,
                error = %err,
                "Request body rejected"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request entity too large").into_response();
        }
    };

    let request = Request::from_parts(parts.method, &parts.uri, parts.headers, body);
    let app = state.app.clone();
    // Collections may block; keep them off the async workers.
    match tokio::task::spawn_blocking(move || app.handle(&request)).await {
        Ok(response) => response.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Pipeline task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
