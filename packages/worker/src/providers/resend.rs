use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use common::contracts::{Message, Provider};
use common::{Channel, NotifyError};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Cap on how much of an upstream response we read, so a misbehaving
/// provider can't exhaust memory.
const MAX_RESPONSE_BYTES: usize = 1 << 20;

/// Email delivery via the Resend API.
///
/// The API key goes only into the Authorization header; it never appears
/// in errors or logs.
pub struct ResendProvider {
    api_key: String,
    from_address: String,
    from_name: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ResendErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ResendSuccessBody {
    id: String,
}

impl ResendProvider {
    pub fn new(
        api_key: impl Into<String>,
        from_address: impl Into<String>,
        from_name: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::provider(Channel::Email, format!("building client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            from_address: from_address.into(),
            from_name: from_name.into(),
            client,
        })
    }

    fn from_header(&self) -> String {
        if self.from_name.is_empty() {
            self.from_address.clone()
        } else {
            format!("{} <{}>", self.from_name, self.from_address)
        }
    }
}

async fn read_capped(mut response: reqwest::Response) -> Result<Vec<u8>, reqwest::Error> {
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = MAX_RESPONSE_BYTES - buf.len();
        if chunk.len() >= remaining {
            buf.extend_from_slice(&chunk[..remaining]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

#[async_trait]
impl Provider for ResendProvider {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, message: &Message) -> Result<String, NotifyError> {
        let mut payload = json!({
            "from": self.from_header(),
            "to": [&message.to],
            "subject": &message.subject,
            "html": &message.html,
        });

        // Include plain-text version if available
        if !message.text.is_empty() {
            payload["text"] = json!(&message.text);
        }

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::provider(Channel::Email, format!("executing request: {e}")))?;

        let status = response.status();
        let body = read_capped(response)
            .await
            .map_err(|e| NotifyError::provider(Channel::Email, format!("reading response: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ResendErrorBody>(&body)
                .ok()
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("resend API error: status {}", status.as_u16()));
            return Err(NotifyError::provider(Channel::Email, detail));
        }

        let success: ResendSuccessBody = serde_json::from_slice(&body).map_err(|e| {
            NotifyError::provider(Channel::Email, format!("parsing resend response: {e}"))
        })?;

        Ok(success.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_with_and_without_name() {
        let provider = ResendProvider::new("key", "noreply@example.com", "Notifly").unwrap();
        assert_eq!(provider.from_header(), "Notifly <noreply@example.com>");

        let provider = ResendProvider::new("key", "noreply@example.com", "").unwrap();
        assert_eq!(provider.from_header(), "noreply@example.com");
    }

    #[test]
    fn test_channel_is_email() {
        let provider = ResendProvider::new("key", "noreply@example.com", "").unwrap();
        assert_eq!(provider.channel(), Channel::Email);
    }

    #[test]
    fn test_error_body_parsing_falls_back_to_status() {
        let parsed = serde_json::from_slice::<ResendErrorBody>(b"not json")
            .ok()
            .map(|e| e.message)
            .filter(|m| !m.is_empty());
        assert!(parsed.is_none());

        let parsed = serde_json::from_slice::<ResendErrorBody>(br#"{"message":"invalid to"}"#)
            .ok()
            .map(|e| e.message)
            .filter(|m| !m.is_empty());
        assert_eq!(parsed.as_deref(), Some("invalid to"));
    }
}
