//! HTTP billing endpoint client

use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

use crate::{PaymentError, PaymentGateway, PaymentRequest, PaymentResult};

/// Calls the billing endpoint with a GET request
pub struct HttpPaymentGateway {
    client: Client,
    endpoint: String,
}

impl HttpPaymentGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PaymentGateway for HttpPaymentGateway {
    fn request_payment(&self, request: &PaymentRequest) -> PaymentResult<String> {
        debug!(endpoint = %self.endpoint, query = %request.query_string(), "Requesting payment");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&request.query_pairs())
            .send()
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| PaymentError::Request(e.to_string()))?
            .trim()
            .to_string();

        if !status.is_success() {
            return Err(PaymentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}
