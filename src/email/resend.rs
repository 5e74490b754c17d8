//! Resend API client

use crate::email::{EmailError, EmailMessage, EmailResult, Mailer};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Clone)]
pub struct ResendClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: Option<String>,
}

impl ResendClient {
    pub fn new(api_key: impl Into<String>) -> EmailResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| EmailError::NetworkError {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, message: EmailMessage) -> EmailResult<Option<String>> {
        let mut body = json!({
            "from": message.from,
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
        });
        if let Some(reply_to) = &message.reply_to {
            body["reply_to"] = json!(reply_to);
        }

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::NetworkError {
                message: format!("email request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EmailError::ProviderError {
                message: format!("HTTP {}: {}", status, text),
            });
        }

        let parsed: ResendResponse =
            response.json().await.map_err(|e| EmailError::ProviderError {
                message: format!("invalid provider JSON response: {}", e),
            })?;

        Ok(parsed.id)
    }
}
