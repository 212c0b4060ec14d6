use anyhow::Context;
use async_trait::async_trait;

use super::BookingBackend;
use crate::models::{BookingOutcome, BookingRequest, CancelRequest};

/// Forwards requests to an external reservation service as JSON.
pub struct HttpBookingBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBookingBackend {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post<T: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> anyhow::Result<BookingOutcome> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .context("failed to call booking service")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse booking service response")?;

        // Rejections may arrive with a 4xx status but still carry an outcome body.
        match serde_json::from_value::<BookingOutcome>(data.clone()) {
            Ok(outcome) => Ok(outcome),
            Err(_) if !status.is_success() => {
                anyhow::bail!("booking service error ({}): {}", status, data)
            }
            Err(e) => Err(e).context("unexpected booking service response"),
        }
    }
}

#[async_trait]
impl BookingBackend for HttpBookingBackend {
    async fn create(&self, request: &BookingRequest) -> anyhow::Result<BookingOutcome> {
        self.post("/reservations", request).await
    }

    async fn cancel(&self, request: &CancelRequest) -> anyhow::Result<BookingOutcome> {
        self.post("/reservations/cancel", request).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
