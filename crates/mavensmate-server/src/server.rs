//! HTTP server lifecycle and routing.

use anyhow::{Context, Result};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use mavensmate_core::{FsProjectLifecycle, ProjectCache, ServerConfig, WorkspaceResolver};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::gate::ProjectGate;
use crate::handlers;
use crate::middleware::{attach_project, attach_project_id};
use crate::signals;

/// Shared state for handlers and middleware
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<ProjectGate>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(gate: ProjectGate) -> Self {
        Self {
            gate: Arc::new(gate),
            start_time: Instant::now(),
        }
    }

    /// State backed by the configured workspaces and on-disk projects
    pub fn from_config(config: &ServerConfig) -> Self {
        let gate = ProjectGate::new(
            Arc::new(ProjectCache::new()),
            Arc::new(WorkspaceResolver::new(config.mm_workspace.clone())),
            Arc::new(FsProjectLifecycle::new()),
        );
        Self::new(gate)
    }
}

/// Build the application router.
///
/// Every route, static assets included, passes through the project id and
/// project gate middleware.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/execute", post(handlers::execute))
        .route("/status", get(handlers::status))
        .route("/app/project/:id", get(handlers::project_page))
        .route("/app/project/:id/*page", get(handlers::project_page).post(handlers::execute));

    if let Some(dir) = static_dir {
        router = router.nest_service("/app/static", ServeDir::new(dir));
    }

    router
        .layer(from_fn_with_state(state.clone(), attach_project))
        .layer(from_fn(attach_project_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The MavensMate HTTP server
pub struct Server {
    config: ServerConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            shutdown_tx,
        }
    }

    /// Sender that stops the server when signalled
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run until a shutdown signal arrives
    pub async fn run(&self) -> Result<()> {
        tracing::info!(
            listen = %self.config.listen,
            workspaces = ?self.config.mm_workspace,
            "Server starting"
        );

        if self.config.mm_workspace.is_empty() {
            tracing::warn!("No mm_workspace configured, projects cannot be resolved");
        }

        let state = AppState::from_config(&self.config);
        let app = build_router(state, self.config.static_dir.as_deref());

        let listener = TcpListener::bind(&self.config.listen)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.listen))?;

        let shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(signals::wait_for_shutdown(shutdown_rx))
            .await
            .context("HTTP server error")?;

        tracing::info!("Server stopped");
        Ok(())
    }
}
