//! pushupctl - operator tool for the pushupd handoff files
//!
//! Queues commands the same way the web application does and answers the
//! questions the web application asks before queuing.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pushup_config::{Settings, load_config_or_default};
use pushup_core::{BusyLock, CommandInbox, EnqueueTarget, enqueue};
use pushup_store::{PushupConfig, SqliteStore, StoreOptions, ViolationStore};
use pushup_util::{RuleId, UserId, default_config_path};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pushupctl")]
#[command(about = "Queue push-up commands and inspect pushupd state", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/pushupd/config.toml)
    #[arg(short, long, env = "PUSHUP_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Database path override
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Queue a command for the counter
    Enqueue {
        /// Rule to settle
        #[arg(long, conflicts_with = "user", required_unless_present = "user")]
        rule: Option<i64>,

        /// Settle the user's most recent rule
        #[arg(long)]
        user: Option<i64>,

        /// Name shown on the counter
        #[arg(long)]
        name: String,
    },

    /// Print READY or BUSY, clearing a stale busy lock
    Status,

    /// Print the rule of the user's oldest unpaid violation, or 0
    ActiveRule {
        #[arg(long)]
        user: i64,
    },
}

fn open_store(settings: &Settings) -> Result<SqliteStore> {
    let options = StoreOptions {
        policy_owner_id: settings.store.policy_owner_id,
        fallback: PushupConfig::new(
            settings.store.default_repetitions,
            settings.store.default_rest_seconds,
        ),
    };
    SqliteStore::open(&settings.store.database, options)
        .with_context(|| format!("Failed to open database {:?}", settings.store.database))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Diagnostics go to stderr; stdout carries the answer
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut settings = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    if let Some(database) = args.database {
        settings.store.database = database;
    }

    let inbox = CommandInbox::new(&settings.handoff.command_file);
    let lock = BusyLock::new(&settings.handoff.busy_lock);

    match args.command {
        Cmd::Enqueue { rule, user, name } => {
            let target = match (rule, user) {
                (Some(rule), _) => EnqueueTarget::Rule(RuleId::new(rule)),
                (None, Some(user)) => EnqueueTarget::User(UserId::new(user)),
                (None, None) => bail!("Either --rule or --user is required"),
            };
            let store = open_store(&settings)?;
            let command = enqueue(&inbox, &lock, &store, target, &name)?;
            println!("{command}");
        }
        Cmd::Status => {
            let status = lock
                .status(settings.handoff.stale_lock_after)
                .context("Failed to inspect busy lock")?;
            println!("{}", status.as_str());
        }
        Cmd::ActiveRule { user } => {
            let store = open_store(&settings)?;
            let rule = store
                .oldest_unpaid_rule_for_user(UserId::new(user))
                .context("Failed to look up unpaid violations")?;
            println!("{}", rule.map_or(0, |r| r.get()));
        }
    }

    Ok(())
}
