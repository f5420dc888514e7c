use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::invoice::Invoice;

/// Read-only access to the invoicing platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceSource: Send + Sync {
    async fn get_invoices(
        &self,
        property_external_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Invoice>>;
}

/// Some deployments wrap the list, others return it bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum InvoiceEnvelope {
    Bare(Vec<Invoice>),
    Wrapped { invoices: Vec<Invoice> },
    Data { data: Vec<Invoice> },
}

impl InvoiceEnvelope {
    fn into_invoices(self) -> Vec<Invoice> {
        match self {
            InvoiceEnvelope::Bare(invoices)
            | InvoiceEnvelope::Wrapped { invoices }
            | InvoiceEnvelope::Data { data: invoices } => invoices,
        }
    }
}

#[derive(Clone)]
pub struct HttpInvoiceSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpInvoiceSource {
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl InvoiceSource for HttpInvoiceSource {
    async fn get_invoices(
        &self,
        property_external_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Invoice>> {
        let url = format!("{}/properties/{}/invoices", self.base_url, property_external_id);
        let mut request = self.client.get(&url).query(&[
            ("start_date", start.format("%Y-%m-%d").to_string()),
            ("end_date", end.format("%Y-%m-%d").to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(property_external_id, %status, %body, "invoice api returned an error");
            return Err(Error::Internal(format!(
                "invoice api responded with {} for property #{}",
                status, property_external_id
            )));
        }

        let invoices = response.json::<InvoiceEnvelope>().await?.into_invoices();
        tracing::info!(
            property_external_id,
            %start,
            %end,
            count = invoices.len(),
            "fetched invoices"
        );
        Ok(invoices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_shapes() {
        for body in [
            json!([{"id": 1, "value": "10"}]),
            json!({"invoices": [{"id": 1, "value": "10"}]}),
            json!({"data": [{"id": 1, "value": 10}]}),
        ] {
            let invoices = serde_json::from_value::<InvoiceEnvelope>(body)
                .unwrap()
                .into_invoices();
            assert_eq!(invoices.len(), 1);
            assert_eq!(invoices[0].value, "10");
        }
    }
}
