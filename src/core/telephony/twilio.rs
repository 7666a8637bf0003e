use std::time::Duration;

use tracing::{error, info};

use super::{CallControl, TelephonyError};

pub const TWILIO_API_URL: &str = "https://api.twilio.com/2010-04-01";

/// Twilio REST call control
pub struct TwilioCallControl {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioCallControl {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self, TelephonyError> {
        Self::with_base_url(TWILIO_API_URL, account_sid, auth_token)
    }

    /// Point the client at a different API root (used by tests)
    pub fn with_base_url(
        base_url: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self, TelephonyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TelephonyError::InvalidConfiguration(format!("HTTP client error: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        })
    }

    fn call_url(&self, call_id: &str) -> String {
        format!(
            "{}/Accounts/{}/Calls/{}.json",
            self.base_url, self.account_sid, call_id
        )
    }
}

#[async_trait::async_trait]
impl CallControl for TwilioCallControl {
    async fn terminate(&self, call_id: &str) -> Result<(), TelephonyError> {
        let response = self
            .client
            .post(self.call_url(call_id))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await
            .map_err(|e| TelephonyError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Twilio API error ({}): {}", status, body);
            return Err(TelephonyError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        info!("Call {} terminated", call_id);
        Ok(())
    }
}
