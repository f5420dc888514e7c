pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::Store;
use crate::error::Result;
use crate::services::{
    admin_service::AdminService,
    invoice_service::{HttpInvoiceSource, InvoiceSource},
    notification_service::{DisabledNotifier, HttpNotifier, Notifier},
    otp_service::MemoryOtpService,
};
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub admin_service: AdminService,
    pub otp_service: Arc<MemoryOtpService>,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Store) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let notifier: Arc<dyn Notifier> = match &config.mail_service_url {
            Some(url) => Arc::new(HttpNotifier::new(
                http_client.clone(),
                url.clone(),
                config.mail_service_token.clone(),
            )),
            None => {
                tracing::warn!("MAIL_SERVICE_URL not set, outgoing mail is disabled");
                Arc::new(DisabledNotifier)
            }
        };
        let invoices = Arc::new(HttpInvoiceSource::new(
            http_client,
            config.invoice_api_url.clone(),
            config.invoice_api_key.clone(),
        ));

        Ok(Self::from_parts(config, store, notifier, invoices))
    }

    /// Wires the services over caller-supplied collaborators.
    pub fn from_parts(
        config: Arc<Config>,
        store: Store,
        notifier: Arc<dyn Notifier>,
        invoices: Arc<dyn InvoiceSource>,
    ) -> Self {
        let otp_service = Arc::new(MemoryOtpService::new(
            notifier.clone(),
            config.otp_ttl_seconds,
        ));
        let admin_service = AdminService::new(
            store,
            notifier,
            invoices,
            otp_service.clone(),
            config.portal_url.clone(),
        );

        Self {
            config,
            admin_service,
            otp_service,
        }
    }
}
