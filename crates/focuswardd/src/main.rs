//! focuswardd - The focusward native messaging host
//!
//! The browser launches this process and talks to it over stdin/stdout.
//! It wires together:
//! - Configuration loading
//! - The policy store
//! - The native messaging host adapter
//! - The enforcement engine
//! - The reconciliation and tamper verification schedules

use anyhow::{Context, Result};
use clap::Parser;
use focusward_config::load_config_or_default;
use focusward_core::{
    reconcile_tick, verify_overlays, CoreEvent, EnforcementEngine, FollowUp, SleepEdgeTracker,
};
use focusward_host_api::BrowserHost;
use focusward_host_native::NativeHost;
use focusward_store::{PolicyChange, PolicyStore, SqliteStore};
use focusward_util::{default_config_path, now_ms};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// focuswardd - Distraction blocking for the browser
#[derive(Parser, Debug)]
#[command(name = "focuswardd")]
#[command(about = "Native messaging host that keeps distracting sites out of reach", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/focusward/config.toml)
    #[arg(short, long, env = "FOCUSWARD_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set FOCUSWARD_DATA_DIR env var)
    #[arg(short, long, env = "FOCUSWARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Browsers append the extension origin to the command line
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    browser_args: Vec<String>,
}

/// Main service state
struct Service {
    engine: Arc<EnforcementEngine>,
    host: Arc<NativeHost>,
    store: Arc<dyn PolicyStore>,
    reconcile_interval: Duration,
    tamper_interval: Duration,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let config = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            sites = config.sites.len(),
            "Configuration loaded"
        );

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("focusward.db");
        let store: Arc<dyn PolicyStore> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        let host = Arc::new(NativeHost::stdio(config.service.request_timeout));
        let engine = Arc::new(EnforcementEngine::new(&config, store.clone(), host.clone()));

        Ok(Self {
            engine,
            host,
            store,
            reconcile_interval: config.service.reconcile_interval,
            tamper_interval: config.service.tamper_interval,
        })
    }

    async fn run(self) -> Result<()> {
        let mut browser_events = self
            .host
            .subscribe()
            .context("Browser event stream already taken")?;
        let mut policy_changes = self.store.subscribe();

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;

        // Reconciliation runs on its own task so browser round-trips never delay it
        let (reconcile_tx, reconcile_rx) = mpsc::unbounded_channel();
        let reconciler = tokio::spawn(run_reconcile_schedule(
            self.engine.clone(),
            self.reconcile_interval,
            reconcile_rx,
        ));

        let mut tamper_timer = tokio::time::interval(self.tamper_interval);
        tamper_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // At most one overlay sweep at a time
        let mut tamper_sweep: JoinSet<Vec<CoreEvent>> = JoinSet::new();
        // Browser events and policy reactions, each on its own task
        let mut handlers: JoinSet<Vec<CoreEvent>> = JoinSet::new();

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                _ = tamper_timer.tick() => {
                    self.start_tamper_sweep(&mut tamper_sweep);
                    self.engine.cleanup();
                }

                event = browser_events.recv() => {
                    match event {
                        Some(event) => {
                            let engine = self.engine.clone();
                            handlers.spawn(async move { engine.handle_event(event, now_ms()).await });
                        }
                        None => {
                            info!("Browser closed the connection, shutting down");
                            break;
                        }
                    }
                }

                change = policy_changes.recv() => {
                    match change {
                        Ok(change) => {
                            let engine = self.engine.clone();
                            let reconcile_tx = reconcile_tx.clone();
                            handlers.spawn(async move {
                                handle_policy_change(&engine, &change, &reconcile_tx).await
                            });
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(missed, "Missed policy changes, running full passes");
                            request_reconcile(&reconcile_tx);
                            self.start_tamper_sweep(&mut tamper_sweep);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("Policy change stream closed, resubscribing");
                            policy_changes = self.store.subscribe();
                        }
                    }
                }

                Some(joined) = handlers.join_next() => log_task_events(joined),
                Some(joined) = tamper_sweep.join_next() => log_task_events(joined),
            }
        }

        reconciler.abort();
        handlers.abort_all();
        tamper_sweep.abort_all();

        info!(
            store_healthy = self.store.is_healthy(),
            host_healthy = self.host.is_healthy(),
            "Service stopped"
        );
        Ok(())
    }

    fn start_tamper_sweep(&self, tamper_sweep: &mut JoinSet<Vec<CoreEvent>>) {
        if !tamper_sweep.is_empty() {
            debug!("Previous overlay check still running, skipping");
            return;
        }
        let engine = self.engine.clone();
        tamper_sweep.spawn(async move { verify_overlays(&engine, now_ms()).await });
    }
}

/// React to a policy change and kick off whatever pass it calls for
async fn handle_policy_change(
    engine: &EnforcementEngine,
    change: &PolicyChange,
    reconcile_tx: &mpsc::UnboundedSender<()>,
) -> Vec<CoreEvent> {
    let (follow_up, mut events) = engine.handle_policy_change(change).await;
    match follow_up {
        FollowUp::None => {}
        FollowUp::TamperPass => events.extend(verify_overlays(engine, now_ms()).await),
        FollowUp::ReconcilePass => request_reconcile(reconcile_tx),
    }
    events
}

fn request_reconcile(reconcile_tx: &mpsc::UnboundedSender<()>) {
    if reconcile_tx.send(()).is_err() {
        warn!("Reconciliation schedule is gone");
    }
}

/// The 1 s reconciliation schedule, also run on request.
///
/// Owns the sleep edge state; ticks never overlap one another.
async fn run_reconcile_schedule(
    engine: Arc<EnforcementEngine>,
    interval: Duration,
    mut requests: mpsc::UnboundedReceiver<()>,
) {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sleep_edges = SleepEdgeTracker::new();

    loop {
        tokio::select! {
            _ = timer.tick() => {}
            request = requests.recv() => {
                if request.is_none() {
                    break;
                }
            }
        }

        let events = reconcile_tick(&engine, &mut sleep_edges, now_ms()).await;
        log_core_events(&events);
    }
}

fn log_task_events(joined: Result<Vec<CoreEvent>, JoinError>) {
    match joined {
        Ok(events) => log_core_events(&events),
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!(error = %e, "Enforcement task failed"),
    }
}

fn log_core_events(events: &[CoreEvent]) {
    for event in events {
        debug!(event = ?event, "Core event");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries native messaging frames; logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "focuswardd starting"
    );

    if !args.browser_args.is_empty() {
        debug!(browser_args = ?args.browser_args, "Launched by browser");
    }

    let service = Service::new(&args)?;
    let code = match service.run().await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "Service failed");
            1
        }
    };

    // The stdin reader sits on a blocking thread that would hold up runtime shutdown
    std::process::exit(code)
}
