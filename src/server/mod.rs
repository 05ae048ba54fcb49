use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use color_eyre::{eyre::eyre, Result};
use tokio::signal;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::missive::panel::PanelHandle;
use crate::monday::cached_client::CachedMondayClient;
use crate::monday::resolver::EmailResolver;

pub mod error;
mod routes;

#[derive(Clone)]
pub struct AppState {
  pub monday: CachedMondayClient,
  pub resolver: EmailResolver,
  pub panel: Arc<PanelHandle>,
}

/// API routes plus, when given, the panel's static assets at `/`.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
  let mut app = routes::router(state);

  if let Some(dir) = static_dir {
    app = app.fallback_service(ServeDir::new(dir));
  }

  app
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
}

pub async fn run_server(app: Router, host: &str, port: u16) -> Result<()> {
  let addr: SocketAddr = format!("{}:{}", host, port)
    .parse()
    .map_err(|e| eyre!("Invalid listen address {}:{}: {}", host, port, e))?;

  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", addr, e))?;
  info!(%addr, "server running");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| eyre!("Server error: {}", e))?;

  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
      Ok(mut term) => {
        term.recv().await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  info!("shutting down");
}
