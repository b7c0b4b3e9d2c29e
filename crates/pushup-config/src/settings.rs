//! Validated settings structures

use crate::schema::{
    RawConfig, RawDeviceConfig, RawHandoffConfig, RawPaymentConfig, RawSessionConfig,
    RawStoreConfig,
};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_COMMAND_FILE: &str = "/var/www/html/iva/pushup_cmd.txt";
pub const DEFAULT_BUSY_LOCK: &str = "/var/www/html/iva/pushup_busy.lock";
pub const DEFAULT_STALE_LOCK_SECONDS: u64 = 300;

pub const DEFAULT_PREFERRED_PORT: &str = "/dev/serial/by-id/usb-1a86_USB_Serial-if00-port0";
pub const DEFAULT_SCAN_PREFIXES: [&str; 2] = ["/dev/ttyUSB", "/dev/ttyACM"];
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_SETTLE_MS: u64 = 2000;

pub const DEFAULT_POLICY_OWNER_ID: i64 = 10;
pub const DEFAULT_REPETITIONS: u32 = 20;
pub const DEFAULT_REST_SECONDS: u32 = 20;

pub const DEFAULT_PAYMENT_ENDPOINT: &str = "http://192.168.11.66/engine/modules/tech/ask_pay_bill1.php";
pub const DEFAULT_PAYMENT_TIMEOUT_MS: u64 = 5000;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MIN_SESSION_SECONDS: u64 = 2;
pub const DEFAULT_MANUAL_PAID_CHECK_EVERY: u32 = 5;

/// Validated settings ready for use by the daemon
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub handoff: HandoffSettings,
    pub device: DeviceSettings,
    pub store: StoreSettings,
    pub payment: PaymentSettings,
    pub session: SessionSettings,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            handoff: HandoffSettings::from_raw(raw.handoff),
            device: DeviceSettings::from_raw(raw.device),
            store: StoreSettings::from_raw(raw.store),
            payment: PaymentSettings::from_raw(raw.payment),
            session: SessionSettings::from_raw(raw.session),
        }
    }
}

/// Command file and busy lock locations
#[derive(Debug, Clone)]
pub struct HandoffSettings {
    pub command_file: PathBuf,
    pub busy_lock: PathBuf,
    pub stale_lock_after: Duration,
}

impl HandoffSettings {
    fn from_raw(raw: RawHandoffConfig) -> Self {
        Self {
            command_file: raw
                .command_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COMMAND_FILE)),
            busy_lock: raw
                .busy_lock
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BUSY_LOCK)),
            stale_lock_after: Duration::from_secs(
                raw.stale_lock_seconds.unwrap_or(DEFAULT_STALE_LOCK_SECONDS),
            ),
        }
    }
}

impl Default for HandoffSettings {
    fn default() -> Self {
        Self::from_raw(RawHandoffConfig::default())
    }
}

/// Serial device discovery and line settings
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub preferred_port: PathBuf,
    pub scan_prefixes: Vec<String>,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub settle_delay: Duration,
}

impl DeviceSettings {
    fn from_raw(raw: RawDeviceConfig) -> Self {
        Self {
            preferred_port: raw
                .preferred_port
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFERRED_PORT)),
            scan_prefixes: raw
                .scan_prefixes
                .unwrap_or_else(|| DEFAULT_SCAN_PREFIXES.iter().map(|s| s.to_string()).collect()),
            baud_rate: raw.baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
            read_timeout: Duration::from_millis(
                raw.read_timeout_ms.unwrap_or(DEFAULT_READ_TIMEOUT_MS),
            ),
            settle_delay: Duration::from_millis(raw.settle_ms.unwrap_or(DEFAULT_SETTLE_MS)),
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self::from_raw(RawDeviceConfig::default())
    }
}

/// Violation database settings
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub database: PathBuf,
    pub policy_owner_id: i64,
    pub default_repetitions: u32,
    pub default_rest_seconds: u32,
}

impl StoreSettings {
    fn from_raw(raw: RawStoreConfig) -> Self {
        Self {
            database: raw
                .database
                .unwrap_or_else(pushup_util::default_database_path),
            policy_owner_id: raw.policy_owner_id.unwrap_or(DEFAULT_POLICY_OWNER_ID),
            default_repetitions: raw.default_repetitions.unwrap_or(DEFAULT_REPETITIONS),
            default_rest_seconds: raw.default_rest_seconds.unwrap_or(DEFAULT_REST_SECONDS),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::from_raw(RawStoreConfig::default())
    }
}

/// Billing endpoint settings
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub endpoint: String,
    pub timeout: Duration,
}

impl PaymentSettings {
    fn from_raw(raw: RawPaymentConfig) -> Self {
        Self {
            endpoint: raw
                .endpoint
                .unwrap_or_else(|| DEFAULT_PAYMENT_ENDPOINT.to_string()),
            timeout: Duration::from_millis(raw.timeout_ms.unwrap_or(DEFAULT_PAYMENT_TIMEOUT_MS)),
        }
    }
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self::from_raw(RawPaymentConfig::default())
    }
}

/// Session policy for the control loop
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    /// `DONE` reports arriving sooner than this after dispatch are ignored
    pub min_session: Duration,
    pub manual_paid_check_every: u32,
}

impl SessionSettings {
    fn from_raw(raw: RawSessionConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(
                raw.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            min_session: Duration::from_secs(
                raw.min_session_seconds.unwrap_or(DEFAULT_MIN_SESSION_SECONDS),
            ),
            // Used as a modulus, never zero
            manual_paid_check_every: raw
                .manual_paid_check_every
                .unwrap_or(DEFAULT_MANUAL_PAID_CHECK_EVERY)
                .max(1),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_raw(RawSessionConfig::default())
    }
}
