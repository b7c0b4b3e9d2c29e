//! Payment trigger for pushupd
//!
//! After a completed series the control loop asks the billing endpoint to
//! settle the violation. The call is fire-and-log: no retries.

mod http;
mod mock;

pub use http::*;
pub use mock::*;

use pushup_util::{UserId, ViolationId};
use thiserror::Error;

/// Errors from the billing endpoint
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Payment request failed: {0}")]
    Request(String),

    #[error("Billing endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Parameters of one payment request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRequest {
    pub violation_id: ViolationId,
    pub user_id: UserId,
}

impl PaymentRequest {
    pub fn new(violation_id: ViolationId, user_id: UserId) -> Self {
        Self {
            violation_id,
            user_id,
        }
    }

    /// Query parameters in the order the endpoint documents them.
    /// `t_or_f` is always affirmative.
    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("viol_id", self.violation_id.to_string()),
            ("t_or_f", "1".to_string()),
            ("user_id", self.user_id.to_string()),
        ]
    }

    /// `viol_id=..&t_or_f=1&user_id=..`
    pub fn query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Billing endpoint interface
pub trait PaymentGateway: Send + Sync {
    /// Request payment; returns the trimmed response body
    fn request_payment(&self, request: &PaymentRequest) -> PaymentResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_order() {
        let request = PaymentRequest::new(ViolationId::new(99), UserId::new(42));
        assert_eq!(request.query_string(), "viol_id=99&t_or_f=1&user_id=42");
    }
}
