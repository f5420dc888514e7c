use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::services::otp_service::OtpPurpose;

#[derive(Debug, Clone, Serialize)]
pub struct WelcomeEmail {
    pub name: String,
    pub email: String,
    pub password: String,
    pub portal_url: String,
}

/// Outbound mail. Delivery is fire-and-forget: implementations report
/// success as a boolean and never fail the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_welcome_email(&self, email: &WelcomeEmail) -> bool;
    async fn send_accountant_welcome_email(&self, email: &WelcomeEmail) -> bool;
    async fn send_otp_email(&self, to: &str, code: &str, purpose: OtpPurpose) -> bool;
}

#[derive(Serialize)]
struct MailRequest<'a> {
    template: &'a str,
    to: &'a str,
    data: serde_json::Value,
}

/// Posts templated mail requests to the mail service.
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    api_url: String,
    api_token: Option<String>,
}

impl HttpNotifier {
    pub fn new(client: Client, api_url: String, api_token: Option<String>) -> Self {
        Self {
            client,
            api_url,
            api_token,
        }
    }

    async fn deliver(&self, template: &str, to: &str, data: serde_json::Value) -> bool {
        let mut request = self.client.post(&self.api_url).json(&MailRequest {
            template,
            to,
            data,
        });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(template, to, "mail accepted by mail service");
                true
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                error!(template, to, %status, %body, "mail service rejected message");
                false
            }
            Err(err) => {
                error!(template, to, error = %err, "mail service unreachable");
                false
            }
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_welcome_email(&self, email: &WelcomeEmail) -> bool {
        self.deliver("owner_welcome", &email.email, json!(email)).await
    }

    async fn send_accountant_welcome_email(&self, email: &WelcomeEmail) -> bool {
        self.deliver("accountant_welcome", &email.email, json!(email))
            .await
    }

    async fn send_otp_email(&self, to: &str, code: &str, purpose: OtpPurpose) -> bool {
        self.deliver("otp", to, json!({ "code": code, "purpose": purpose }))
            .await
    }
}

/// Used when no mail service is configured; nothing is delivered.
#[derive(Clone, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send_welcome_email(&self, email: &WelcomeEmail) -> bool {
        warn!(to = %email.email, "mail service not configured, welcome email dropped");
        false
    }

    async fn send_accountant_welcome_email(&self, email: &WelcomeEmail) -> bool {
        warn!(to = %email.email, "mail service not configured, welcome email dropped");
        false
    }

    async fn send_otp_email(&self, to: &str, _code: &str, purpose: OtpPurpose) -> bool {
        warn!(to, ?purpose, "mail service not configured, verification code dropped");
        false
    }
}
