use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use missive_monday::cache::SystemClock;
use missive_monday::config::Config;
use missive_monday::logging;
use missive_monday::missive::panel::PanelHandle;
use missive_monday::monday::cached_client::CachedMondayClient;
use missive_monday::monday::client::MondayClient;
use missive_monday::monday::resolver::EmailResolver;
use missive_monday::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "missive-monday")]
#[command(about = "Missive sidebar backend for Monday.com boards")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/missive-monday/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Port to listen on (overrides config and PORT)
  #[arg(short, long)]
  port: Option<u16>,

  /// Board searched by email lookups
  #[arg(short, long)]
  board: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(port) = args.port {
    config.server.port = port;
  }
  if let Some(board) = args.board {
    config.monday.board_id = board;
  }

  let _log_guard = logging::init(config.log.file.as_deref())?;

  let client = MondayClient::new(&config)?;
  let resolver = EmailResolver::new(client.clone(), &config.monday);
  let state = AppState {
    monday: CachedMondayClient::new(client, &config, Arc::new(SystemClock)),
    panel: PanelHandle::spawn(resolver.clone()),
    resolver,
  };

  tracing::info!(
    board_id = %config.monday.board_id,
    email_column = %config.monday.email_column_id,
    "starting missive-monday"
  );

  let app = server::build_router(state, config.server.static_dir.as_deref());
  server::run_server(app, &config.server.host, config.server.port).await
}
