//! Viewer gateway service: HTTP routes and the listener.

use crate::connection::serve_socket;
use crate::domain::GatewayConfig;
use crate::errors::GatewayError;
use crate::server_state::{ServerState, ServerStats};
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    server: Arc<ServerState>,
    config: Arc<GatewayConfig>,
}

/// Routes: the home page at `/`, the viewer socket at `/ws`, counters at
/// `/stats`. Anything else is a 404; non-GET methods get a 405.
pub fn router(server: Arc<ServerState>, config: Arc<GatewayConfig>) -> Router {
    Router::new()
        .route("/", get(serve_home))
        .route("/ws", get(serve_ws))
        .route("/stats", get(serve_stats))
        .with_state(AppState { server, config })
}

async fn serve_home(State(app): State<AppState>) -> Response {
    match tokio::fs::read_to_string(&app.config.home_page).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!(path = %app.config.home_page.display(), error = %e, "Home page unavailable");
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}

async fn serve_ws(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let limit = app.config.frame_limit(app.server.sync_config().window_size);
    ws.max_message_size(limit)
        .on_upgrade(move |socket| serve_socket(app.server, app.config, socket))
}

async fn serve_stats(State(app): State<AppState>) -> Json<ServerStats> {
    Json(app.server.stats())
}

/// A bound, not yet serving, gateway.
pub struct ViewerGateway {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl ViewerGateway {
    pub async fn bind(config: GatewayConfig, server: Arc<ServerState>) -> Result<Self, GatewayError> {
        config.validate().map_err(GatewayError::Config)?;
        let addr = config.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            router: router(server, Arc::new(config)),
            local_addr,
        })
    }

    /// The bound address (the real port when bound to port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %self.local_addr, "Viewer gateway listening");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Viewer gateway stopped");
        Ok(())
    }
}
