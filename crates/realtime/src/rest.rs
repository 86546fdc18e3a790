//! Initial load over REST.
//!
//! Live deltas only make sense on top of a snapshot; this client fetches one
//! and hands it to the reconciler as wholesale [`Seed`]s.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use gasdesk_auth::Role;
use gasdesk_core::AgencyId;
use gasdesk_logistics::{Agency, Agent, InventoryItem, Order, Product};
use gasdesk_pricing::{Coupon, PlatformCharge, TaxConfig};

use crate::credentials::Credentials;
use crate::reconciler::{ReconcilerHandle, Seed};

#[derive(Debug, Error)]
pub enum RestError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Envelope(String),
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: JsonValue,
}

/// Unwrap `{success, message, data}` into `data`.
fn unwrap_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, RestError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        if (200..300).contains(&status) {
            RestError::Envelope(e.to_string())
        } else {
            RestError::Api {
                status,
                message: body.to_string(),
            }
        }
    })?;
    if !envelope.success || !(200..300).contains(&status) {
        return Err(RestError::Api {
            status,
            message: envelope.message,
        });
    }
    serde_json::from_value(envelope.data).map_err(|e| RestError::Envelope(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RestError> {
        let resp = self
            .http
            .get(format!("{}/api{}", self.base_url, path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        unwrap_envelope(status, &body)
    }

    pub async fn orders(&self) -> Result<Vec<Order>, RestError> {
        self.get("/orders").await
    }

    pub async fn agents(&self) -> Result<Vec<Agent>, RestError> {
        self.get("/agents").await
    }

    pub async fn agencies(&self) -> Result<Vec<Agency>, RestError> {
        self.get("/agencies").await
    }

    pub async fn products(&self) -> Result<Vec<Product>, RestError> {
        self.get("/products").await
    }

    pub async fn inventory(&self, agency_id: &AgencyId) -> Result<Vec<InventoryItem>, RestError> {
        self.get(&format!("/inventory/{agency_id}")).await
    }

    pub async fn coupons(&self) -> Result<Vec<Coupon>, RestError> {
        self.get("/coupons").await
    }

    pub async fn tax(&self) -> Result<Option<TaxConfig>, RestError> {
        self.get("/tax").await
    }

    pub async fn platform_charge(&self) -> Result<Option<PlatformCharge>, RestError> {
        self.get("/platform-charge").await
    }

    /// Load everything the session's role sees and replace the reconciler's
    /// collections with it. Stops at the first failed request.
    pub async fn seed(&self, handle: &ReconcilerHandle, credentials: &Credentials) -> Result<(), RestError> {
        handle.seed(Seed::Orders(self.orders().await?));
        handle.seed(Seed::Products(self.products().await?));

        match credentials.role {
            Role::Admin => {
                handle.seed(Seed::Agencies(self.agencies().await?));
                handle.seed(Seed::Agents(self.agents().await?));
                handle.seed(Seed::Coupons(self.coupons().await?));
                handle.seed(Seed::Tax(self.tax().await?));
                handle.seed(Seed::PlatformCharge(self.platform_charge().await?));
            }
            Role::AgencyOwner => {
                handle.seed(Seed::Agents(self.agents().await?));
                if let Some(agency_id) = &credentials.agency_id {
                    handle.seed(Seed::Inventory(self.inventory(agency_id).await?));
                }
            }
            Role::Customer | Role::Agent => {}
        }

        tracing::info!(role = %credentials.role, "initial state loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_is_unwrapped_from_the_envelope() {
        let tax: Option<TaxConfig> = unwrap_envelope(
            200,
            r#"{"success":true,"message":"Tax configuration fetched successfully","data":null}"#,
        )
        .unwrap();
        assert!(tax.is_none());
    }

    #[test]
    fn failure_envelopes_carry_the_server_message() {
        let err = unwrap_envelope::<Vec<Order>>(
            403,
            r#"{"success":false,"message":"Forbidden","error":"admin role required"}"#,
        )
        .unwrap_err();
        match err {
            RestError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Forbidden");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_json_errors_keep_the_body() {
        let err = unwrap_envelope::<Vec<Order>>(502, "Bad Gateway").unwrap_err();
        assert!(matches!(err, RestError::Api { status: 502, .. }));
    }

    #[test]
    fn mistyped_data_is_an_envelope_error() {
        let err = unwrap_envelope::<Vec<Order>>(200, r#"{"success":true,"data":{"id":1}}"#).unwrap_err();
        assert!(matches!(err, RestError::Envelope(_)));
    }
}
