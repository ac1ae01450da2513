//! Brocard virtual card API client

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{CardIssuer, CardIssuerError, IssuedCard};
use crate::config::CardIssuerConfig;

#[derive(Serialize)]
struct IssueRequest<'a> {
    #[serde(rename = "type")]
    card_type: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    balance: Decimal,
    comment: &'static str,
}

#[derive(Deserialize)]
struct IssueResponse {
    success: bool,
    #[serde(default)]
    message: String,
    data: Option<IssueData>,
}

#[derive(Deserialize)]
struct IssueData {
    id: i64,
    card_number: String,
    cvv: String,
    expiry: String,
}

pub struct BrocardClient {
    base_url: String,
    api_token: String,
    client: reqwest::Client,
}

impl BrocardClient {
    pub fn new(config: &CardIssuerConfig) -> Result<Self, CardIssuerError> {
        if config.api_token.is_empty() {
            return Err(CardIssuerError::Config("api_token is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CardIssuerError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            client,
        })
    }
}

#[async_trait]
impl CardIssuer for BrocardClient {
    fn name(&self) -> &'static str {
        "brocard"
    }

    async fn issue_card(
        &self,
        amount: Decimal,
        card_type: &str,
    ) -> Result<IssuedCard, CardIssuerError> {
        let response = self
            .client
            .post(format!("{}/cards/issue", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&IssueRequest {
                card_type,
                balance: amount,
                comment: "Permia Order",
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CardIssuerError::Timeout
                } else {
                    CardIssuerError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body: IssueResponse = response.json().await.map_err(|e| {
            CardIssuerError::Transport(format!("Failed to parse response (HTTP {}): {}", status, e))
        })?;

        match body.data {
            Some(data) if body.success => {
                let card = IssuedCard {
                    card_id: data.id.to_string(),
                    pan: data.card_number,
                    cvv: data.cvv,
                    expiry: data.expiry,
                };
                info!(card_id = %card.card_id, pan = %card.masked_pan(), "Card issued");
                Ok(card)
            }
            _ => {
                warn!(http_status = %status, message = %body.message, "Card issue rejected");
                Err(CardIssuerError::Rejected(body.message))
            }
        }
    }
}
