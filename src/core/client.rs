use crate::core::envelope::fault_message;
use crate::domain::ports::RemoteCaller;
use crate::utils::error::{LoanError, Result};
use reqwest::Client;
use std::time::Duration;

pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Single-shot POST transport for envelopes. No retries.
#[derive(Debug, Clone)]
pub struct SoapClient {
    client: Client,
    timeout: Duration,
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl SoapClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait::async_trait]
impl RemoteCaller for SoapClient {
    async fn call(&self, endpoint: &str, envelope: &str) -> Result<String> {
        tracing::debug!("📡 POST {} ({} bytes)", endpoint, envelope.len());

        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .timeout(self.timeout)
            .body(envelope.to_string())
            .send()
            .await
            .map_err(|e| {
                let cause = if e.is_timeout() {
                    format!("timed out after {:?}", self.timeout)
                } else {
                    e.to_string()
                };
                LoanError::transport(endpoint, cause)
            })?;

        let status = response.status();
        tracing::debug!("📡 {} responded with {}", endpoint, status);

        let body = response
            .text()
            .await
            .map_err(|e| LoanError::transport(endpoint, e))?;

        if !status.is_success() {
            let cause = match fault_message(&body) {
                Some(fault) => format!("HTTP {}: {}", status, fault),
                None => format!("HTTP {}", status),
            };
            return Err(LoanError::transport(endpoint, cause));
        }

        Ok(body)
    }
}
