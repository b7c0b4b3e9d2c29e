//! pushupd - The push-up counter bridge
//!
//! This is the main entry point for the pushupd service.
//! It wires together all the components:
//! - Configuration loading
//! - Violation store
//! - Serial device discovery
//! - Billing endpoint
//! - Core engine and the polling loop

use anyhow::{Context, Result};
use clap::Parser;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use pushup_billing::HttpPaymentGateway;
use pushup_config::{Settings, load_config_or_default};
use pushup_core::{BridgeEngine, BusyLock, CommandInbox, CoreEvent};
use pushup_device::{SerialDevice, SerialOptions};
use pushup_store::{PushupConfig, SqliteStore, StoreOptions, ViolationStore};
use pushup_util::{MonotonicInstant, default_config_path};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// pushupd - Push-up counter bridge
#[derive(Parser, Debug)]
#[command(name = "pushupd")]
#[command(about = "Bridges queued push-up commands to the counter and settles violations", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/pushupd/config.toml)
    #[arg(short, long, env = "PUSHUP_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Database path override
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Serial port override (skips discovery)
    #[arg(short, long)]
    port: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Last termination signal received, 0 while running
static SHUTDOWN_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn record_signal(signal: nix::libc::c_int) {
    SHUTDOWN_SIGNAL.store(signal, Ordering::SeqCst);
}

fn install_signal_handlers() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(record_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );

    for signal in [Signal::SIGTERM, Signal::SIGINT, Signal::SIGHUP] {
        // The handler only stores into an atomic
        unsafe { sigaction(signal, &action) }
            .with_context(|| format!("Failed to install {signal} handler"))?;
    }

    Ok(())
}

fn shutdown_requested() -> Option<Signal> {
    match SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        0 => None,
        raw => Signal::try_from(raw).ok().or(Some(Signal::SIGTERM)),
    }
}

/// Main service state
struct Service {
    engine: BridgeEngine,
    settings: Settings,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let mut settings = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        if let Some(database) = &args.database {
            settings.store.database = database.clone();
        }
        if let Some(port) = &args.port {
            settings.device.preferred_port = port.clone();
        }

        info!(config_path = %args.config.display(), "Configuration loaded");

        // Store
        if let Some(parent) = settings.store.database.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {:?}", parent))?;
        }

        let store_options = StoreOptions {
            policy_owner_id: settings.store.policy_owner_id,
            fallback: PushupConfig::new(
                settings.store.default_repetitions,
                settings.store.default_rest_seconds,
            ),
        };
        let store = SqliteStore::open(&settings.store.database, store_options)
            .with_context(|| format!("Failed to open database {:?}", settings.store.database))?;

        if !store.is_healthy() {
            warn!("Store health check failed, continuing");
        }
        info!(db_path = %store.path().display(), "Store initialized");

        // Device
        let device = SerialDevice::open(&SerialOptions {
            preferred_port: settings.device.preferred_port.clone(),
            scan_prefixes: settings.device.scan_prefixes.clone(),
            baud_rate: settings.device.baud_rate,
            read_timeout: settings.device.read_timeout,
            settle_delay: settings.device.settle_delay,
        })
        .context("Failed to open push-up counter")?;

        // Billing
        let payments =
            HttpPaymentGateway::new(settings.payment.endpoint.clone(), settings.payment.timeout)
                .context("Failed to create payment client")?;

        info!(endpoint = %payments.endpoint(), "Payment gateway initialized");

        let engine = BridgeEngine::new(
            Arc::new(store),
            Arc::new(payments),
            Box::new(device),
            CommandInbox::new(&settings.handoff.command_file),
            BusyLock::new(&settings.handoff.busy_lock),
            settings.session.clone(),
        );

        Ok(Self { engine, settings })
    }

    fn run(mut self) -> Result<()> {
        install_signal_handlers()?;

        let poll_interval = self.settings.session.poll_interval;
        info!(
            poll_interval_ms = poll_interval.as_millis() as u64,
            "Service running"
        );

        loop {
            if let Some(signal) = shutdown_requested() {
                info!(signal = %signal, "Received signal, shutting down");
                break;
            }

            let step = self.engine.step(MonotonicInstant::now());
            for event in &step.events {
                log_event(event);
            }

            if step.pause {
                std::thread::sleep(poll_interval);
            }
        }

        if let Some(session) = self.engine.current_session() {
            warn!(
                session_id = %session.session_id,
                rule_id = %session.rule_id,
                "Exiting with a session in progress, busy lock left in place"
            );
        }

        info!("Shutdown complete");
        Ok(())
    }
}

fn log_event(event: &CoreEvent) {
    match event {
        CoreEvent::SessionCompleted {
            session_id,
            rule_id,
            violation_id,
            payment_ok,
            marked_paid,
            elapsed,
            ..
        } => {
            info!(
                session_id = %session_id,
                rule_id = %rule_id,
                violation_id = ?violation_id.map(|v| v.get()),
                payment_ok,
                marked_paid,
                elapsed_secs = elapsed.as_secs(),
                "Session finished"
            );
        }
        other => debug!(event = ?other, "Core event"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "pushupd starting");

    let service = Service::new(&args)?;
    service.run()
}
