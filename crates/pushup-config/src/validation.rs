//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[{section}] {field}: {message}")]
    FieldError {
        section: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("Command file and busy lock must be different files")]
    HandoffPathsCollide,

    #[error("Invalid payment endpoint '{0}': expected an http:// or https:// URL")]
    InvalidEndpoint(String),
}

impl ValidationError {
    fn field(section: &'static str, field: &'static str, message: impl Into<String>) -> Self {
        Self::FieldError {
            section,
            field,
            message: message.into(),
        }
    }
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Handoff
    let handoff = &config.handoff;
    if let (Some(cmd), Some(lock)) = (&handoff.command_file, &handoff.busy_lock)
        && cmd == lock
    {
        errors.push(ValidationError::HandoffPathsCollide);
    }
    for (field, path) in [
        ("command_file", &handoff.command_file),
        ("busy_lock", &handoff.busy_lock),
    ] {
        if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            errors.push(ValidationError::field("handoff", field, "path cannot be empty"));
        }
    }

    // Device
    let device = &config.device;
    if device.baud_rate == Some(0) {
        errors.push(ValidationError::field("device", "baud_rate", "must be greater than zero"));
    }
    if device.read_timeout_ms == Some(0) {
        errors.push(ValidationError::field(
            "device",
            "read_timeout_ms",
            "must be greater than zero",
        ));
    }
    if let Some(prefixes) = &device.scan_prefixes
        && prefixes.iter().any(|p| p.trim().is_empty())
    {
        errors.push(ValidationError::field(
            "device",
            "scan_prefixes",
            "prefixes cannot be empty strings",
        ));
    }

    // Store
    let store = &config.store;
    if store.default_repetitions == Some(0) {
        errors.push(ValidationError::field(
            "store",
            "default_repetitions",
            "must be greater than zero",
        ));
    }

    // Payment
    if let Some(endpoint) = &config.payment.endpoint
        && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        errors.push(ValidationError::InvalidEndpoint(endpoint.clone()));
    }
    if config.payment.timeout_ms == Some(0) {
        errors.push(ValidationError::field("payment", "timeout_ms", "must be greater than zero"));
    }

    // Session
    if config.session.manual_paid_check_every == Some(0) {
        errors.push(ValidationError::field(
            "session",
            "manual_paid_check_every",
            "must be greater than zero",
        ));
    }

    errors
}
