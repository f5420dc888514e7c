use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

use crate::models::user::normalize_email;
use crate::services::notification_service::Notifier;
use crate::utils::token::generate_numeric_code;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    AdminBootstrap,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpService: Send + Sync {
    async fn send_otp(&self, email: &str, purpose: OtpPurpose) -> bool;
    /// Consumes the code on success.
    async fn verify_otp(&self, email: &str, code: &str) -> bool;
}

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    purpose: OtpPurpose,
    expires_at: DateTime<Utc>,
}

/// One pending code per email, each carrying its own expiry. Expired codes
/// are rejected on read; `sweep_expired` only reclaims memory.
#[derive(Clone)]
pub struct MemoryOtpService {
    codes: Arc<Mutex<HashMap<String, PendingCode>>>,
    notifier: Arc<dyn Notifier>,
    ttl: Duration,
}

impl MemoryOtpService {
    pub fn new(notifier: Arc<dyn Notifier>, ttl_seconds: i64) -> Self {
        Self {
            codes: Arc::new(Mutex::new(HashMap::new())),
            notifier,
            ttl: Duration::seconds(ttl_seconds.max(1)),
        }
    }

    async fn issue(&self, email: &str, purpose: OtpPurpose, now: DateTime<Utc>) -> String {
        let code = generate_numeric_code(6);
        self.codes.lock().await.insert(
            normalize_email(email),
            PendingCode {
                code: code.clone(),
                purpose,
                expires_at: now + self.ttl,
            },
        );
        code
    }

    async fn verify_at(&self, email: &str, code: &str, now: DateTime<Utc>) -> bool {
        let key = normalize_email(email);
        let mut codes = self.codes.lock().await;
        let Some(pending) = codes.get(&key) else {
            return false;
        };
        if pending.expires_at <= now {
            codes.remove(&key);
            return false;
        }
        let matches: bool = pending.code.as_bytes().ct_eq(code.trim().as_bytes()).into();
        if matches {
            tracing::debug!(email = %key, purpose = ?pending.purpose, "verification code accepted");
            codes.remove(&key);
        }
        matches
    }

    /// Drops expired codes and returns how many were removed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut codes = self.codes.lock().await;
        let before = codes.len();
        codes.retain(|_, pending| pending.expires_at > now);
        before - codes.len()
    }
}

#[async_trait]
impl OtpService for MemoryOtpService {
    async fn send_otp(&self, email: &str, purpose: OtpPurpose) -> bool {
        let code = self.issue(email, purpose, Utc::now()).await;
        let sent = self.notifier.send_otp_email(email, &code, purpose).await;
        if !sent {
            self.codes.lock().await.remove(&normalize_email(email));
        }
        sent
    }

    async fn verify_otp(&self, email: &str, code: &str) -> bool {
        self.verify_at(email, code, Utc::now()).await
    }
}
