//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Command file and busy lock locations
    #[serde(default)]
    pub handoff: RawHandoffConfig,

    /// Serial device settings
    #[serde(default)]
    pub device: RawDeviceConfig,

    /// Violation database settings
    #[serde(default)]
    pub store: RawStoreConfig,

    /// Payment endpoint settings
    #[serde(default)]
    pub payment: RawPaymentConfig,

    /// Session policy
    #[serde(default)]
    pub session: RawSessionConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawHandoffConfig {
    /// File the web application drops `rule_id|name` into
    pub command_file: Option<PathBuf>,

    /// Marker file present while the device is occupied
    pub busy_lock: Option<PathBuf>,

    /// Age after which `pushupctl status` treats the lock as stale
    pub stale_lock_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDeviceConfig {
    /// Stable device path tried before scanning
    pub preferred_port: Option<PathBuf>,

    /// Port name prefixes accepted when scanning, e.g. `/dev/ttyUSB`
    pub scan_prefixes: Option<Vec<String>>,

    pub baud_rate: Option<u32>,

    /// Per-line read timeout
    pub read_timeout_ms: Option<u64>,

    /// Wait after opening the port while the board resets
    pub settle_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStoreConfig {
    /// SQLite database path
    pub database: Option<PathBuf>,

    /// `parents.p_id` whose configuration rows apply
    pub policy_owner_id: Option<i64>,

    /// Repetitions used when a child has no configuration row
    pub default_repetitions: Option<u32>,

    /// Rest time used when a child has no configuration row
    pub default_rest_seconds: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPaymentConfig {
    /// Billing endpoint URL
    pub endpoint: Option<String>,

    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSessionConfig {
    /// Sleep between polls when idle or when the device sent nothing
    pub poll_interval_ms: Option<u64>,

    /// `DONE` reports arriving sooner than this after dispatch are ignored
    pub min_session_seconds: Option<u64>,

    /// Check for out-of-band payment on every Nth poll while busy
    pub manual_paid_check_every: Option<u32>,
}
