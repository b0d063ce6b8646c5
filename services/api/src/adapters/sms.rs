//! services/api/src/adapters/sms.rs
//!
//! This module contains the adapter for Twilio's Messages API.
//! It implements the `SmsChannel` port from the `core` crate.

use async_trait::async_trait;
use crop_health_core::alerts::OutbreakAlert;
use crop_health_core::ports::{PortError, PortResult, SmsChannel};

use crate::config::SmsConfig;

/// An adapter that implements `SmsChannel` using the Twilio REST API.
#[derive(Clone)]
pub struct TwilioSmsAdapter {
    client: reqwest::Client,
    config: SmsConfig,
}

impl TwilioSmsAdapter {
    pub fn new(client: reqwest::Client, config: SmsConfig) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.config.api_base, self.config.account_sid)
    }
}

#[async_trait]
impl SmsChannel for TwilioSmsAdapter {
    async fn send_outbreak_alert(&self, phone: &str, alert: &OutbreakAlert) -> PortResult<()> {
        let body = alert.sms_body();
        let form = [
            ("To", phone),
            ("From", self.config.from_number.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("SMS provider unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "SMS provider returned {}: {}",
                status.as_u16(),
                detail
            )));
        }
        Ok(())
    }
}
