// service/paystack.rs
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::Config;

const GATEWAY_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Gateway declined the request: {0}")]
    Declined(String),

    #[error("Gateway returned an unexpected payload: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Result of a verify call. A network failure is reported as
/// `success = false` with the error attached to the raw payload, never as
/// an ambiguous state.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub success: bool,
    pub raw: Value,
}

/// Thin client around the Paystack transaction API. All amounts cross the
/// wire in kobo. No retry logic: a failed call is surfaced to the caller.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    secret_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl PaystackClient {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GATEWAY_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            secret_key: config.paystack_secret_key.clone(),
            base_url: config.paystack_base_url.clone(),
            client,
        }
    }

    pub async fn initialize_transaction(
        &self,
        email: &str,
        amount_kobo: i64,
        reference: &str,
        callback_url: &str,
        metadata: Option<Value>,
    ) -> Result<CheckoutSession, GatewayError> {
        let payload = json!({
            "email": email,
            "amount": amount_kobo,
            "reference": reference,
            "callback_url": callback_url,
            "currency": "NGN",
            "metadata": metadata.unwrap_or_else(|| json!({})),
        });

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let body: Value = response.json().await?;
        parse_initialize_response(&body)
    }

    pub async fn verify_transaction(&self, reference: &str) -> VerificationOutcome {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);

        let response = match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Paystack verification error for {}: {}", reference, e);
                return VerificationOutcome {
                    success: false,
                    raw: json!({ "status": false, "message": e.to_string() }),
                };
            }
        };

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Paystack verification body error for {}: {}", reference, e);
                return VerificationOutcome {
                    success: false,
                    raw: json!({ "status": false, "message": e.to_string() }),
                };
            }
        };

        VerificationOutcome {
            success: parse_verify_response(&body),
            raw: body,
        }
    }
}

fn parse_initialize_response(body: &Value) -> Result<CheckoutSession, GatewayError> {
    if !body["status"].as_bool().unwrap_or(false) {
        let message = body["message"]
            .as_str()
            .unwrap_or("Payment initialization failed")
            .to_string();
        return Err(GatewayError::Declined(message));
    }

    let data = &body["data"];
    let checkout_url = data["authorization_url"]
        .as_str()
        .ok_or_else(|| GatewayError::MalformedResponse("missing authorization_url".to_string()))?;
    let reference = data["reference"]
        .as_str()
        .ok_or_else(|| GatewayError::MalformedResponse("missing reference".to_string()))?;

    Ok(CheckoutSession {
        checkout_url: checkout_url.to_string(),
        access_code: data["access_code"].as_str().unwrap_or("").to_string(),
        reference: reference.to_string(),
    })
}

/// A transaction is only treated as paid when the envelope status is true
/// and the inner transaction status is "success".
fn parse_verify_response(body: &Value) -> bool {
    body["status"].as_bool().unwrap_or(false) && body["data"]["status"].as_str() == Some("success")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_response_parsed() {
        let body = json!({
            "status": true,
            "data": {
                "authorization_url": "https://checkout.paystack.com/abc123",
                "access_code": "abc123",
                "reference": "AGC-REGISTRATION-INDIVIDUAL-9F2C41AB"
            }
        });

        let session = parse_initialize_response(&body).unwrap();
        assert_eq!(session.checkout_url, "https://checkout.paystack.com/abc123");
        assert_eq!(session.reference, "AGC-REGISTRATION-INDIVIDUAL-9F2C41AB");
    }

    #[test]
    fn declined_initialize_carries_gateway_message() {
        let body = json!({ "status": false, "message": "Invalid key" });

        match parse_initialize_response(&body) {
            Err(GatewayError::Declined(message)) => assert_eq!(message, "Invalid key"),
            other => panic!("expected Declined, got {:?}", other),
        }
    }

    #[test]
    fn verify_requires_inner_success() {
        assert!(parse_verify_response(&json!({
            "status": true, "data": { "status": "success" }
        })));
        assert!(!parse_verify_response(&json!({
            "status": true, "data": { "status": "failed" }
        })));
        assert!(!parse_verify_response(&json!({
            "status": false, "message": "timeout"
        })));
    }
}
