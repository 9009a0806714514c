//! Client for the print server running on the merchant's local network
//!
//! The print server exposes the shop's printers over HTTP:
//! `GET /status`, `GET /printers` and `POST /jobs`.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::config::PrintingConfig;
use crate::error::{AppError, AppResult};

/// Print server API client
#[derive(Clone)]
pub struct PrintServerClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintServerStatus {
    pub online: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub printers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterInfo {
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// Content types accepted by the print server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintContentType {
    Html,
    Text,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrintJob {
    pub printer: String,
    pub content_type: PrintContentType,
    pub content: String,
    pub copies: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJobAccepted {
    pub job_id: String,
}

impl PrintServerClient {
    pub fn new(config: &PrintingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let token = Some(config.print_server_token.trim())
            .filter(|t| !t.is_empty())
            .map(String::from);

        Ok(Self {
            client,
            base_url: config.print_server_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| AppError::PrintServer(format!("Print server unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::PrintServer(format!("Print server returned {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::PrintServer(format!("Invalid print server response: {}", e)))
    }

    /// Check that the print server answers
    pub async fn status(&self) -> AppResult<PrintServerStatus> {
        self.send(self.client.get(format!("{}/status", self.base_url))).await
    }

    pub async fn list_printers(&self) -> AppResult<Vec<PrinterInfo>> {
        self.send(self.client.get(format!("{}/printers", self.base_url))).await
    }

    pub async fn send_job(&self, job: &PrintJob) -> AppResult<PrintJobAccepted> {
        if job.copies == 0 {
            return Err(AppError::field("copies", "At least one copy is required"));
        }
        tracing::debug!(printer = %job.printer, copies = job.copies, "Sending print job");
        self.send(self.client.post(format!("{}/jobs", self.base_url)).json(job))
            .await
    }
}
