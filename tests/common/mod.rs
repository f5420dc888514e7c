#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use jsonwebtoken::{encode, EncodingKey, Header};
use rental_admin_backend::{
    config::Config,
    database::Store,
    error::Result,
    models::invoice::Invoice,
    routes,
    services::{
        invoice_service::InvoiceSource,
        notification_service::{Notifier, WelcomeEmail},
        otp_service::OtpPurpose,
    },
    AppState,
};
use serde_json::Value as JsonValue;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test_secret_key";

/// Records everything it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub welcome: Mutex<Vec<WelcomeEmail>>,
    pub accountant_welcome: Mutex<Vec<WelcomeEmail>>,
    pub codes: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn last_code(&self) -> Option<String> {
        self.codes.lock().unwrap().last().map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_welcome_email(&self, email: &WelcomeEmail) -> bool {
        self.welcome.lock().unwrap().push(email.clone());
        !self.fail
    }

    async fn send_accountant_welcome_email(&self, email: &WelcomeEmail) -> bool {
        self.accountant_welcome.lock().unwrap().push(email.clone());
        !self.fail
    }

    async fn send_otp_email(&self, to: &str, code: &str, _purpose: OtpPurpose) -> bool {
        self.codes
            .lock()
            .unwrap()
            .push((to.to_string(), code.to_string()));
        !self.fail
    }
}

/// Serves the same invoices for every property and range.
#[derive(Default)]
pub struct FixedInvoices {
    pub invoices: Vec<Invoice>,
    pub calls: Mutex<Vec<(i64, NaiveDate, NaiveDate)>>,
}

impl FixedInvoices {
    pub fn with_values(values: &[&str]) -> Self {
        Self {
            invoices: values
                .iter()
                .enumerate()
                .map(|(i, v)| Invoice::new(&format!("INV-{}", i + 1), v))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl InvoiceSource for FixedInvoices {
    async fn get_invoices(
        &self,
        property_external_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Invoice>> {
        self.calls
            .lock()
            .unwrap()
            .push((property_external_id, start, end));
        Ok(self.invoices.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Store,
    pub notifier: Arc<RecordingNotifier>,
    pub invoices: Arc<FixedInvoices>,
}

pub fn setup_app_with(notifier: RecordingNotifier, invoices: FixedInvoices) -> TestApp {
    let store = Store::memory();
    let notifier = Arc::new(notifier);
    let invoices = Arc::new(invoices);
    let state = AppState::from_parts(
        Arc::new(Config::for_tests(JWT_SECRET)),
        store.clone(),
        notifier.clone(),
        invoices.clone(),
    );
    TestApp {
        router: routes::router(state),
        store,
        notifier,
        invoices,
    }
}

pub fn setup_app() -> TestApp {
    setup_app_with(
        RecordingNotifier::default(),
        FixedInvoices::with_values(&["100.00", "200.00", "50.00"]),
    )
}

pub fn token_for(role: &str) -> String {
    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        role: Option<String>,
    }
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    encode(
        &Header::default(),
        &Claims {
            sub: "tester".into(),
            exp,
            role: Some(role.into()),
        },
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("sign token")
}

pub fn admin_auth() -> String {
    format!("Bearer {}", token_for("admin"))
}

impl TestApp {
    /// Sends a request with an admin token and returns status and JSON body
    /// (`Null` for empty bodies).
    pub async fn call(&self, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
        self.call_with_auth(method, uri, body, Some(admin_auth())).await
    }

    pub async fn call_with_auth(
        &self,
        method: &str,
        uri: &str,
        body: Option<JsonValue>,
        auth: Option<String>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };
        (status, json)
    }
}
