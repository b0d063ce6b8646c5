//! services/api/src/adapters/mail.rs
//!
//! This module contains the adapter for the transactional mail HTTP API.
//! It implements the `EmailChannel` port from the `core` crate.

use async_trait::async_trait;
use crop_health_core::alerts::OutbreakAlert;
use crop_health_core::ports::{EmailChannel, PortError, PortResult};
use serde::Serialize;

use crate::config::MailConfig;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `EmailChannel` by posting JSON to a mail API.
#[derive(Clone)]
pub struct HttpMailAdapter {
    client: reqwest::Client,
    config: MailConfig,
}

impl HttpMailAdapter {
    /// Creates a new `HttpMailAdapter`.
    pub fn new(client: reqwest::Client, config: MailConfig) -> Self {
        Self { client, config }
    }
}

/// Request body for the mail API's send endpoint.
#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: String,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

//=========================================================================================
// `EmailChannel` Trait Implementation
//=========================================================================================

#[async_trait]
impl EmailChannel for HttpMailAdapter {
    async fn send_outbreak_alert(&self, address: &str, alert: &OutbreakAlert) -> PortResult<()> {
        let body = SendEmailRequest {
            from: format!("Crop Health Alerts <{}>", self.config.sender),
            to: [address],
            subject: alert.email_subject(),
            html: alert.email_html(),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Mail provider unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Mail provider returned {}: {}",
                status.as_u16(),
                detail
            )));
        }
        Ok(())
    }
}
