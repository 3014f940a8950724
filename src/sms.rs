use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::TwilioConfig;

/// Outbound SMS delivery seam. Production uses Twilio; tests plug in a
/// no-op implementation.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Text placed in the verification SMS.
pub fn verification_message(code: &str) -> String {
    format!("Your verification code is: {}", code)
}

/// Twilio Messages API client.
#[derive(Clone)]
pub struct TwilioSms {
    http: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

/// Subset of the Messages API response we care about.
#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
    status: String,
}

impl TwilioSms {
    pub fn new(config: &TwilioConfig) -> Self {
        Self {
            http: Client::new(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        }
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let form = [
            ("To", to),
            ("From", self.from_number.as_str()),
            ("Body", body),
        ];

        let res = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .context("twilio request")?;

        let status = res.status();
        if !status.is_success() {
            let error_body = res.text().await.unwrap_or_default();
            error!(%status, body = %error_body, "twilio rejected message");
            anyhow::bail!("twilio returned {}", status);
        }

        let message = res
            .json::<MessageResponse>()
            .await
            .context("parse twilio response")?;
        debug!(sid = %message.sid, status = %message.status, "sms dispatched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_embeds_code() {
        assert_eq!(
            verification_message("123456"),
            "Your verification code is: 123456"
        );
    }

    #[test]
    fn message_response_deserializes() {
        let message: MessageResponse = serde_json::from_str(
            r#"{"sid": "SM123", "status": "queued", "to": "+15551234567"}"#,
        )
        .expect("deserialize");
        assert_eq!(message.sid, "SM123");
        assert_eq!(message.status, "queued");
    }
}
