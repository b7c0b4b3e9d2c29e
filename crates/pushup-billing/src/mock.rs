//! Mock billing endpoint for testing

use std::sync::{Arc, Mutex};

use crate::{PaymentError, PaymentGateway, PaymentRequest, PaymentResult};

/// Records payment requests. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    requests: Arc<Mutex<Vec<PaymentRequest>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Configure requests to fail (they are still recorded)
    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

impl PaymentGateway for MockGateway {
    fn request_payment(&self, request: &PaymentRequest) -> PaymentResult<String> {
        self.requests.lock().unwrap().push(*request);
        if *self.fail.lock().unwrap() {
            return Err(PaymentError::Request("Mock payment failure".into()));
        }
        Ok("OK".into())
    }
}
