use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
}

/// Provider acknowledgment for one outbound SMS.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsReceipt {
    pub sid: String,
    pub status: String,
}

/// Thin client for the Twilio Messages send API.
///
/// `base_url` is configurable so tests can point it at a local fake.
#[derive(Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub fn new(base_url: String, account_sid: String, auth_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            account_sid,
            auth_token,
        }
    }

    pub async fn send_sms(
        &self,
        to: &str,
        from: &str,
        body: &str,
    ) -> Result<SmsReceipt, SmsError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let params = [("To", to), ("From", from), ("Body", body)];

        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SmsError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let receipt: SmsReceipt = response.json().await?;
        tracing::debug!("Sent SMS {} to {}", receipt.sid, to);
        Ok(receipt)
    }
}
