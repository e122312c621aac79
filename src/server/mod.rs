mod metrics;
mod routes;
mod ws;

pub use metrics::{MetricsEvent, MetricsTx};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, watch, RwLock};
use tokio::time::{self, MissedTickBehavior};

use crate::constants::{MOCK_LATENCY_MS, REFRESH_INTERVAL_SECS, SETTINGS_PATH};
use crate::logging;
use crate::model::QuoteBatch;
use crate::provider::MockProvider;
use crate::settings::Settings;
use crate::store::StockStore;

/// Cancellation signal observed by every async task, including pending
/// provider fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownSignal {
    None,
    Graceful,
    Immediate,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub refresh_interval: Duration,
    pub mock_latency: Duration,
    pub universe_size: usize,
    pub seed: Option<u64>,
    pub default_page_size: usize,
    pub watchlist: Vec<String>,
    pub max_refreshes: Option<usize>,
    pub enable_http: bool,
}

impl ServerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let bind_addr = settings
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind address {:?}", settings.bind_addr))?;
        Ok(Self {
            bind_addr,
            refresh_interval: Duration::from_secs(settings.refresh_interval_secs),
            mock_latency: Duration::from_millis(settings.mock_latency_ms),
            universe_size: settings.universe_size,
            seed: settings.seed,
            default_page_size: settings.default_page_size,
            watchlist: settings.watchlist.clone(),
            max_refreshes: None,
            enable_http: true,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: crate::constants::BIND_ADDR
                .parse()
                .expect("default bind address parses"),
            refresh_interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
            mock_latency: Duration::from_millis(MOCK_LATENCY_MS),
            universe_size: crate::constants::DEFAULT_UNIVERSE_SIZE,
            seed: None,
            default_page_size: crate::constants::DEFAULT_PAGE_SIZE,
            watchlist: Vec::new(),
            max_refreshes: None,
            enable_http: true,
        }
    }
}

/// Shared handles the HTTP and websocket layers work against.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<StockStore>>,
    pub batches: broadcast::Sender<QuoteBatch>,
    pub metrics: MetricsTx,
    pub default_page_size: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    /// Settings file to load; missing file means defaults
    #[arg(long, default_value = SETTINGS_PATH)]
    pub settings: PathBuf,

    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Override the refresh interval in seconds
    #[arg(long)]
    pub refresh_secs: Option<u64>,

    /// Override the universe size
    #[arg(long)]
    pub universe: Option<usize>,

    /// Fix the universe seed for reproducible data
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            settings: PathBuf::from(SETTINGS_PATH),
            bind: None,
            refresh_secs: None,
            universe: None,
            seed: None,
        }
    }
}

impl ServeArgs {
    pub fn into_config(self) -> Result<ServerConfig> {
        let settings = Settings::load(&self.settings)?;
        let mut config = ServerConfig::from_settings(&settings)?;
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(secs) = self.refresh_secs {
            config.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(universe) = self.universe {
            config.universe_size = universe;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

pub async fn run(args: ServeArgs) -> Result<()> {
    run_with_config(args.into_config()?).await
}

pub async fn run_with_config(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    let seed = config.seed.unwrap_or_else(rand::random);

    let (shutdown_tx, shutdown_rx) = watch::channel(ShutdownSignal::None);

    let provider = MockProvider::new(config.mock_latency, seed, config.universe_size);
    let universe = provider
        .fetch_universe(shutdown_rx.clone())
        .await
        .context("initial universe fetch failed")?;

    let mut store = StockStore::from_universe(universe)?;
    for symbol in &config.watchlist {
        if store.contains(symbol) {
            store.watchlist.add(symbol.clone());
        } else {
            logging::warn(
                "watchlist.unknown_symbol",
                "Configured watchlist symbol not in universe",
                json!({ "symbol": symbol }),
            );
        }
    }
    logging::info(
        "store.ready",
        "Universe loaded",
        json!({ "stocks": store.len(), "seed": seed }),
    );
    let store = Arc::new(RwLock::new(store));

    let (batch_tx, _) = broadcast::channel::<QuoteBatch>(64);
    let (metrics_tx, metrics_task) = metrics::reporter(shutdown_rx.clone());

    let state = AppState {
        store: Arc::clone(&store),
        batches: batch_tx.clone(),
        metrics: metrics_tx.clone(),
        default_page_size: config.default_page_size,
    };

    let signals_task = tokio::spawn(handle_signals(shutdown_tx.clone()));

    let shutdown_for_http = shutdown_rx.clone();
    let shutdown_for_refresh = shutdown_rx;

    let http_future = async {
        if config.enable_http {
            serve_http(Arc::clone(&config), state, shutdown_for_http).await
        } else {
            Ok(())
        }
    };

    let run_result = tokio::try_join!(
        http_future,
        run_refresh_loop(
            Arc::clone(&config),
            store,
            batch_tx,
            metrics_tx,
            seed,
            shutdown_tx.clone(),
            shutdown_for_refresh
        ),
        metrics_task,
    );

    signals_task.abort();
    let _ = signals_task.await;

    run_result?;
    Ok(())
}

async fn handle_signals(shutdown_tx: watch::Sender<ShutdownSignal>) -> Result<()> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("failed to register SIGINT handler")?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                logging::info(
                    "signal.received",
                    "SIGTERM received, initiating graceful shutdown",
                    json!({ "signal": "SIGTERM" })
                );
                if shutdown_tx.send(ShutdownSignal::Graceful).is_err() {
                    break;
                }
            }
            _ = sigint.recv() => {
                logging::warn(
                    "signal.received",
                    "SIGINT received, forcing immediate shutdown",
                    json!({ "signal": "SIGINT" })
                );
                let _ = shutdown_tx.send(ShutdownSignal::Immediate);
                break;
            }
        }
    }

    Ok(())
}

async fn serve_http(
    config: Arc<ServerConfig>,
    state: AppState,
    mut shutdown: watch::Receiver<ShutdownSignal>,
) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind API listener at {}", config.bind_addr))?;

    logging::info(
        "http.bind",
        "API listening for clients",
        json!({ "addr": config.bind_addr.to_string() }),
    );

    let app = routes::router(state);

    let shutdown_signal = async move {
        while shutdown.changed().await.is_ok() {
            if !matches!(*shutdown.borrow(), ShutdownSignal::None) {
                break;
            }
        }
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("api server terminated with error")?;

    logging::info_simple("http.stop", "API server stopped");
    Ok(())
}

async fn run_refresh_loop(
    config: Arc<ServerConfig>,
    store: Arc<RwLock<StockStore>>,
    sender: broadcast::Sender<QuoteBatch>,
    metrics: MetricsTx,
    seed: u64,
    shutdown_tx: watch::Sender<ShutdownSignal>,
    mut shutdown_rx: watch::Receiver<ShutdownSignal>,
) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut ticker = time::interval(config.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.reset();

    let mut completed: usize = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => {
                match *shutdown_rx.borrow() {
                    ShutdownSignal::None => continue,
                    _ => break,
                }
            }
        }

        let outcome = {
            let mut guard = store.write().await;
            guard.refresh(&mut rng)
        };

        metrics.report(MetricsEvent::RefreshBatch {
            quotes: outcome.batch.quotes.len(),
        });
        if !outcome.triggered_alerts.is_empty() {
            metrics.report(MetricsEvent::AlertsTriggered {
                count: outcome.triggered_alerts.len(),
            });
            logging::info(
                "alerts.triggered",
                "Alerts fired during refresh",
                json!({ "ids": outcome.triggered_alerts }),
            );
        }

        let _ = sender.send(outcome.batch);
        completed = completed.saturating_add(1);

        if let Some(max) = config.max_refreshes {
            if completed >= max {
                logging::info(
                    "refresh.limit",
                    "Refresh loop reached its budget",
                    json!({ "max_refreshes": max }),
                );
                let _ = shutdown_tx.send(ShutdownSignal::Graceful);
                break;
            }
        }
    }

    logging::info_simple("refresh.stop", "Refresh loop stopped");
    Ok(())
}

pub mod testkit {
    use super::*;

    /// Drive the refresh loop without the HTTP layer and hand back the
    /// first `count` broadcast batches.
    pub async fn collect_batches(mut config: ServerConfig, count: usize) -> Result<Vec<QuoteBatch>> {
        config.enable_http = false;
        config.max_refreshes = None;
        let seed = config.seed.unwrap_or(0xBADF00D);
        let config = Arc::new(config);

        let (shutdown_tx, shutdown_rx) = watch::channel(ShutdownSignal::None);

        let provider = MockProvider::new(config.mock_latency, seed, config.universe_size);
        let universe = provider.fetch_universe(shutdown_rx.clone()).await?;
        let store = Arc::new(RwLock::new(StockStore::from_universe(universe)?));

        let (batch_tx, _) = broadcast::channel::<QuoteBatch>(64);
        let mut receiver = batch_tx.subscribe();

        let refresh_handle = tokio::spawn(run_refresh_loop(
            Arc::clone(&config),
            store,
            batch_tx,
            MetricsTx::noop(),
            seed,
            shutdown_tx.clone(),
            shutdown_rx,
        ));

        let mut collected = Vec::with_capacity(count);
        while collected.len() < count {
            collected.push(receiver.recv().await?);
        }

        let _ = shutdown_tx.send(ShutdownSignal::Graceful);
        refresh_handle.await??;

        Ok(collected)
    }
}
