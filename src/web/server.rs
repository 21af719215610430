//! Axum HTTP server — REST API plus the WebSocket notification endpoint.

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tracing::info;

use crate::config::WebConfig;
use crate::events::bus::EventBus;
use crate::ledger::Ledger;
use crate::rooms::machine::RoomService;

use super::routes;
use super::ws::WsRegistry;

/// Shared state for all web routes.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub rooms: Arc<RoomService>,
    pub ledger: Arc<Ledger>,
    pub bus: Arc<EventBus>,
    pub ws_registry: Arc<WsRegistry>,
}

/// Axum web server for the API.
pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    pub fn new(
        config: WebConfig,
        db: PgPool,
        rooms: Arc<RoomService>,
        ledger: Arc<Ledger>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                db,
                rooms,
                ledger,
                bus,
                ws_registry: Arc::new(WsRegistry::new()),
            },
        }
    }

    /// Start the HTTP server.
    pub async fn start(self) -> anyhow::Result<()> {
        let app = Router::new()
            .merge(routes::api_routes())
            .with_state(self.state);

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.port));
        info!(port = self.config.port, "api server starting");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
