//! REST adapter for the hosted payment gateway (initialize and verify only).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::payments::{
    GatewayError, PaymentGateway, PaymentInit, PaymentMetadata, PaymentSession,
    PaymentVerification,
};

use super::error::InfraError;

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: Url,
    pub secret_key: Option<String>,
    pub callback_url: Option<Url>,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: Url,
    secret_key: Option<String>,
    callback_url: Option<Url>,
}

impl HttpPaymentGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("lightfield/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()?;
        if settings.secret_key.is_none() {
            warn!(
                target = "lightfield::infra::payments",
                "Payment secret key is not configured; gateway calls will be rejected"
            );
        }
        Ok(Self {
            client,
            base_url: settings.base_url,
            secret_key: settings.secret_key,
            callback_url: settings.callback_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|err| GatewayError::Transport(err.to_string()))
    }

    fn secret(&self) -> Result<&str, GatewayError> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| GatewayError::Rejected("Payment gateway is not configured".into()))
    }

    async fn decode<T>(response: reqwest::Response) -> Result<T, GatewayError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let envelope: Envelope<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(err) if status.is_success() => return Err(GatewayError::Decode(err.to_string())),
            Err(_) => return Err(GatewayError::Transport(format!("gateway returned {status}"))),
        };

        if !envelope.status || status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Rejected(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::Decode("response carried no data".into()))
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: i64,
    reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
    metadata: &'a PaymentMetadata,
}

#[derive(Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    #[serde(default)]
    reference: String,
}

#[derive(Deserialize)]
struct VerifyData {
    status: String,
    amount: i64,
    #[serde(default)]
    channel: Option<String>,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn initialize(&self, request: PaymentInit) -> Result<PaymentSession, GatewayError> {
        let url = self.endpoint("transaction/initialize")?;
        let body = InitializeBody {
            email: &request.email,
            amount: request.amount,
            reference: &request.reference,
            callback_url: self.callback_url.as_ref().map(Url::as_str),
            metadata: &request.metadata,
        };

        debug!(
            target = "lightfield::infra::payments",
            reference = %request.reference,
            amount = request.amount,
            "Initializing gateway transaction"
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(self.secret()?)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let data: InitializeData = Self::decode(response).await?;
        Ok(PaymentSession {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<PaymentVerification, GatewayError> {
        let mut url = self.endpoint("transaction/verify/")?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport("gateway base url cannot be a base".into()))?
            .pop_if_empty()
            .push(reference);

        let response = self
            .client
            .get(url)
            .bearer_auth(self.secret()?)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let data: VerifyData = Self::decode(response).await?;
        Ok(PaymentVerification {
            status: data.status,
            amount: data.amount,
            channel: data.channel,
        })
    }
}
