//! Port for the hosted payment gateway.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(String),
    #[error("{0}")]
    Rejected(String),
    #[error("gateway response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMetadata {
    pub booking_reference: String,
    pub service_name: String,
    pub client_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInit {
    pub email: String,
    /// Minor units.
    pub amount: i64,
    pub reference: String,
    pub metadata: PaymentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentVerification {
    pub status: String,
    /// Minor units actually charged.
    pub amount: i64,
    pub channel: Option<String>,
}

impl PaymentVerification {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, request: PaymentInit) -> Result<PaymentSession, GatewayError>;

    async fn verify(&self, reference: &str) -> Result<PaymentVerification, GatewayError>;
}
