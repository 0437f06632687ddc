// src/api/chargily.rs
//
// Client for the Chargily Pay v2 checkout API (https://pay.chargily.net).
// Authorization: Bearer secret key.

use std::fmt;
use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use utoipa::ToSchema;

pub const CHARGILY_TEST_API_BASE: &str = "https://pay.chargily.net/test/api/v2";

#[derive(Debug)]
enum ChargilyError {
    Http(reqwest::Error),
    Api { status: u16, body: String },
}

impl fmt::Display for ChargilyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargilyError::Http(e) => write!(f, "http error: {e}"),
            ChargilyError::Api { status, body } => {
                write!(f, "chargily api error status={status} body={body}")
            }
        }
    }
}

impl From<reqwest::Error> for ChargilyError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

#[derive(Debug, Clone)]
pub struct ChargilyConfig {
    pub base_url: String,
    pub secret_key: String,
    pub success_url: String,
    pub failure_url: String,
    pub timeout: Duration,
}

/// Opaque metadata attached to a checkout at creation so the webhook can
/// attribute the payment back to a user and plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CheckoutMetadata {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub plan_name: Option<String>,
}

/// Gateway checkout object as delivered by the webhook and the status poll.
/// Every field is optional; the payload is only trusted field by field.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Checkout {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

impl Checkout {
    pub fn is_paid(&self) -> bool {
        self.status.as_deref() == Some("paid")
    }
}

#[derive(Debug)]
pub struct PaymentLink {
    pub url: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
struct CreateCheckoutRequest<'a> {
    amount: Decimal,
    currency: &'a str,
    success_url: &'a str,
    failure_url: &'a str,
    description: &'a str,
    metadata: &'a CheckoutMetadata,
}

#[derive(Debug, Deserialize)]
struct CheckoutCreatedResponse {
    checkout_url: String,
    id: String,
}

#[derive(Clone)]
pub struct ChargilyClient {
    http: HttpClient,
    config: ChargilyConfig,
}

impl ChargilyClient {
    pub fn new(config: ChargilyConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: HttpClient::builder().timeout(config.timeout).build()?,
            config,
        })
    }

    /// Creates a hosted checkout and returns the payment link. Any gateway
    /// failure (timeouts included) degrades to `None`; the caller surfaces a
    /// retry prompt to the user.
    pub async fn create_payment_link(
        &self,
        description: &str,
        amount: Decimal,
        metadata: &CheckoutMetadata,
    ) -> Option<PaymentLink> {
        match self.try_create(description, amount, metadata).await {
            Ok(link) => Some(link),
            Err(e) => {
                log::error!("chargily checkout creation failed: {e}");
                None
            }
        }
    }

    async fn try_create(
        &self,
        description: &str,
        amount: Decimal,
        metadata: &CheckoutMetadata,
    ) -> Result<PaymentLink, ChargilyError> {
        let resp = self
            .http
            .post(format!("{}/checkouts", self.config.base_url))
            .bearer_auth(&self.config.secret_key)
            .json(&CreateCheckoutRequest {
                amount,
                currency: "dzd",
                success_url: &self.config.success_url,
                failure_url: &self.config.failure_url,
                description,
                metadata,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChargilyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: CheckoutCreatedResponse = resp.json().await?;
        Ok(PaymentLink {
            url: body.checkout_url,
            id: body.id,
        })
    }

    /// Fetches checkout details by id; `None` on any failure.
    pub async fn get_checkout(&self, checkout_id: &str) -> Option<Checkout> {
        match self.try_get(checkout_id).await {
            Ok(checkout) => Some(checkout),
            Err(e) => {
                log::error!("chargily get checkout failed id={checkout_id}: {e}");
                None
            }
        }
    }

    async fn try_get(&self, checkout_id: &str) -> Result<Checkout, ChargilyError> {
        let resp = self
            .http
            .get(format!("{}/checkouts/{}", self.config.base_url, checkout_id))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChargilyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<Checkout>().await?)
    }

    /// Verifies the webhook signature: HMAC-SHA256 over the raw payload with
    /// the secret key, compared in constant time. Malformed hex fails closed.
    pub fn verify_signature(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };

        let mut mac = Hmac::<Sha256>::new_from_slice(self.config.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }
}
