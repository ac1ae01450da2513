//! Zarinpal REST v4 client

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::gateway::{GatewayError, PaymentGateway, PaymentIntent, VerifyReceipt};
use crate::config::PaymentGatewayConfig;

/// Zarinpal success
const CODE_OK: i64 = 100;
/// Zarinpal "already verified"
const CODE_VERIFIED: i64 = 101;

#[derive(Serialize)]
struct RequestBody<'a> {
    merchant_id: &'a str,
    amount: i64,
    description: &'a str,
    callback_url: &'a str,
}

#[derive(Serialize)]
struct VerifyBody<'a> {
    merchant_id: &'a str,
    amount: i64,
    authority: &'a str,
}

#[derive(Deserialize, Default)]
struct ResponseData {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    authority: String,
    #[serde(default)]
    ref_id: Option<i64>,
}

#[derive(Deserialize)]
struct Envelope {
    /// `[]` on failure, an object on success
    #[serde(default)]
    data: serde_json::Value,
    /// `[]` on success, `{code, message}` on failure
    #[serde(default)]
    errors: serde_json::Value,
}

impl Envelope {
    fn data(&self) -> Option<ResponseData> {
        serde_json::from_value(self.data.clone())
            .ok()
            .filter(|d: &ResponseData| d.code != 0)
    }

    fn rejection(&self) -> GatewayError {
        let code = self.errors.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
        let message = self
            .errors
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string();
        GatewayError::Rejected { code, message }
    }
}

pub struct ZarinpalClient {
    merchant_id: String,
    request_url: String,
    verify_url: String,
    start_pay_url: String,
    client: reqwest::Client,
}

impl ZarinpalClient {
    pub fn new(config: &PaymentGatewayConfig) -> Result<Self, GatewayError> {
        if config.merchant_id.is_empty() {
            return Err(GatewayError::Transport(
                "merchant_id is not configured".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            merchant_id: config.merchant_id.clone(),
            request_url: config.request_url.clone(),
            verify_url: config.verify_url.clone(),
            start_pay_url: config.start_pay_url.clone(),
            client,
        })
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<Envelope, GatewayError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::Transport(format!("HTTP {}", status)));
        }

        response
            .json::<Envelope>()
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for ZarinpalClient {
    fn name(&self) -> &'static str {
        "zarinpal"
    }

    async fn request_payment(
        &self,
        amount: i64,
        description: &str,
        callback_url: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let envelope = self
            .post(
                &self.request_url,
                &RequestBody {
                    merchant_id: &self.merchant_id,
                    amount,
                    description,
                    callback_url,
                },
            )
            .await?;

        match envelope.data() {
            Some(data) if data.code == CODE_OK && !data.authority.is_empty() => {
                info!(authority = %data.authority, amount, "Zarinpal payment requested");
                Ok(PaymentIntent {
                    redirect_url: self.start_pay_url.replace("{authority}", &data.authority),
                    authority: data.authority,
                })
            }
            Some(data) => {
                warn!(code = data.code, amount, "Zarinpal request refused");
                Err(GatewayError::Rejected {
                    code: data.code,
                    message: data.message,
                })
            }
            None => {
                let err = envelope.rejection();
                warn!(error = %err, amount, "Zarinpal request refused");
                Err(err)
            }
        }
    }

    async fn verify_payment(
        &self,
        amount: i64,
        authority: &str,
    ) -> Result<VerifyReceipt, GatewayError> {
        let envelope = self
            .post(
                &self.verify_url,
                &VerifyBody {
                    merchant_id: &self.merchant_id,
                    amount,
                    authority,
                },
            )
            .await?;

        match envelope.data() {
            Some(data) if data.code == CODE_OK || data.code == CODE_VERIFIED => {
                let reference_id = data.ref_id.map(|r| r.to_string()).unwrap_or_default();
                info!(authority = %authority, ref_id = %reference_id, code = data.code, "Zarinpal payment verified");
                Ok(VerifyReceipt {
                    reference_id,
                    already_verified: data.code == CODE_VERIFIED,
                })
            }
            Some(data) => Err(GatewayError::Rejected {
                code: data.code,
                message: data.message,
            }),
            None => Err(envelope.rejection()),
        }
    }
}
