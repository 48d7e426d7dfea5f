//! Application setup and runtime.

use crate::db::{self, entry_store::EntryFilter, entry_store::EntryStore};
use crate::db::retention::{ExecutionContext, OptimizeOutcome};
use crate::http;
use crate::logger::Devlog;
use crate::watchdog::{Watchdog, WatchdogOptions, WatchdogOutcome, transport::SmtpMailTransport};
use chrono::{DateTime, Utc};
use config::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub mod config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
  pub devlog: Devlog,
  pub config: Arc<Config>,
}

impl AppState {
  /// Connect the database named in the configuration.
  pub async fn connect(config: Config) -> Result<Self, BoxError> {
    let pool = db::connect(&config.database_url).await?;
    let store = EntryStore::new(pool, config.max_extra_data_size);
    let config = Arc::new(config);
    Ok(Self {
      devlog: Devlog::new(store, config.clone()),
      config,
    })
  }

  pub fn store(&self) -> &EntryStore {
    self.devlog.store()
  }
}

/// Start the HTTP server with configured environment.
pub async fn run() -> Result<(), BoxError> {
  crate::util::init_tracing();

  let config = Config::from_env()?;
  let addr: SocketAddr = config.http_addr.parse()?;
  let state = AppState::connect(config).await?;
  let app = http::build_router(state);

  info!("devlog API:           http://{}/entries", addr);
  info!("latest runs:          GET http://{}/runs", addr);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;
  Ok(())
}

/// One retention pass.
pub async fn run_optimize() -> Result<OptimizeOutcome, BoxError> {
  crate::util::init_tracing();

  let state = AppState::connect(Config::from_env()?).await?;
  let mut ctx = ExecutionContext::new();
  let outcome = state.devlog.optimizer().optimize(&mut ctx).await?;
  info!("retention: {:?}", outcome);
  Ok(outcome)
}

/// One watchdog pass over the entries since `last_run`.
pub async fn run_watchdog(
  last_run: DateTime<Utc>,
  force_summary: bool,
) -> Result<WatchdogOutcome, BoxError> {
  crate::util::init_tracing();

  let state = AppState::connect(Config::from_env()?).await?;
  let config = state.config.clone();
  let transport = SmtpMailTransport::from_config(&config)?;
  let watchdog = Watchdog::new(state.store().clone(), transport, config.render_subject());

  let options = WatchdogOptions {
    force_summary: force_summary || config.watchdog.force_summary,
    min_level: config.watchdog.min_level.code(),
    limit: config.watchdog.limit,
    data_var: config.watchdog.data_var,
    transport_id: config.watchdog.transport_id.clone(),
  };
  let outcome = watchdog
    .run(
      &config.watchdog.recipients,
      last_run,
      &EntryFilter::default(),
      &options,
    )
    .await?;
  info!("watchdog: {:?}", outcome);
  Ok(outcome)
}
