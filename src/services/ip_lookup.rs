use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::errors::ServiceError;

/// Source of the caller's public IP, bound into the payment-request
/// signature. The production implementation asks a third-party echo service;
/// tests and development use a fixed address.
#[async_trait]
pub trait IpEcho: Send + Sync {
    async fn public_ip(&self) -> Result<String, ServiceError>;
}

/// Client for an ipify-style echo service returning the caller's public IP
/// as plain text. The call is synchronous with the checkout request and has
/// no retry; a failure fails the checkout.
#[derive(Debug, Clone)]
pub struct IpEchoClient {
    http: reqwest::Client,
    url: String,
}

impl IpEchoClient {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl IpEcho for IpEchoClient {
    #[instrument(skip(self))]
    async fn public_ip(&self) -> Result<String, ServiceError> {
        let response = self.http.get(&self.url).send().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("IP echo request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "IP echo service returned {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("IP echo response unreadable: {}", e))
        })?;

        let ip = body.trim().to_string();
        if ip.is_empty() || !ip.chars().all(|c| c.is_ascii_hexdigit() || ".:".contains(c)) {
            return Err(ServiceError::ExternalServiceError(format!(
                "IP echo service returned an invalid address: {:?}",
                ip
            )));
        }

        debug!(%ip, "resolved caller public IP");
        Ok(ip)
    }
}

/// Fixed-address implementation for tests and offline development.
#[derive(Debug, Clone)]
pub struct FixedIp(pub String);

#[async_trait]
impl IpEcho for FixedIp {
    async fn public_ip(&self) -> Result<String, ServiceError> {
        Ok(self.0.clone())
    }
}
