//! Thin HTTP client for the remote conversion service.
//!
//! One method per contract endpoint, each returning the normalized shape.
//! Any non-2xx response is a failure signal: the body text is captured for
//! display and surfaced as [`ItemError::HttpStatus`] — the orchestrator
//! resolves the affected item to `error` without retrying.

use crate::config::OrchestratorConfig;
use crate::error::{ConvertError, ItemError};
use crate::item::Operation;
use crate::remote::normalize::{
    BatchAccepted, ConvertAcceptedRaw, OperationStatusRaw, UploadRaw, WebsiteRegistration,
};
use crate::item::Item;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// One entry of a batch-convert request: a file id or a URL plus the
/// desired output format.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchRequestEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub target_format: String,
}

/// A downloaded artifact: the raw bytes plus the filename the service
/// suggested via `Content-Disposition`, when it sent one.
#[derive(Debug)]
pub struct DownloadedArtifact {
    pub bytes: Vec<u8>,
    pub suggested_name: Option<String>,
}

/// HTTP client for the conversion service.
#[derive(Clone, Debug)]
pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(config: &OrchestratorConfig) -> Result<Self, ConvertError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ConvertError::HttpClientBuild(e.to_string()))?;
        Ok(ServiceClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Uploads ───────────────────────────────────────────────────────────

    /// Upload file bytes as multipart form data; returns the tracked item
    /// the service's response describes.
    pub async fn upload_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        user_id: Option<&str>,
    ) -> Result<Item, ItemError> {
        let original_format = crate::item::extension_of(filename);
        let mut form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(bytes).file_name(filename.to_string()),
            )
            .text("original_format", original_format);
        if let Some(user_id) = user_id {
            form = form.text("user_id", user_id.to_string());
        }

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(ItemError::from_reqwest)?;
        let raw: UploadRaw = Self::read_json(response).await?;
        Ok(raw.into_item())
    }

    /// Register a website with the service ahead of conversion.
    ///
    /// The returned `file_id` is nullable; a registration without an
    /// artifact id is normal.
    pub async fn register_website(
        &self,
        url: &str,
        name: Option<&str>,
        format: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<WebsiteRegistration, ItemError> {
        let mut body = json!({ "url": url });
        if let Some(name) = name {
            body["name"] = json!(name);
        }
        if let Some(format) = format {
            body["format"] = json!(format);
        }
        if let Some(user_id) = user_id {
            body["user_id"] = json!(user_id);
        }
        self.post_json("/upload/website", &body).await
    }

    // ── Conversion ────────────────────────────────────────────────────────

    /// Submit a file conversion: `source_file_id` → `target_format`.
    pub async fn convert_file(
        &self,
        source_file_id: &str,
        target_format: &str,
        user_id: &str,
    ) -> Result<Operation, ItemError> {
        let body = json!({
            "source_file_id": source_file_id,
            "target_format": target_format,
            "user_id": user_id,
        });
        let raw: ConvertAcceptedRaw = self.post_json("/convert", &body).await?;
        Ok(raw.into_operation())
    }

    /// Submit a website conversion: `url` → `target_format`.
    pub async fn convert_website(
        &self,
        url: &str,
        target_format: &str,
        user_id: &str,
    ) -> Result<Operation, ItemError> {
        let body = json!({
            "url": url,
            "target_format": target_format,
            "user_id": user_id,
        });
        let raw: ConvertAcceptedRaw = self.post_json("/convert/website", &body).await?;
        Ok(raw.into_operation())
    }

    /// Submit several conversions in one request.
    pub async fn batch_convert(
        &self,
        operations: &[BatchRequestEntry],
        user_id: &str,
    ) -> Result<BatchAccepted, ItemError> {
        let body = json!({
            "operations": operations,
            "user_id": user_id,
        });
        self.post_json("/batch-convert", &body).await
    }

    // ── Status ────────────────────────────────────────────────────────────

    /// Fetch the current status of a file-conversion operation.
    pub async fn operation_status(&self, operation_id: &str) -> Result<Operation, ItemError> {
        let raw: OperationStatusRaw = self
            .get_json(&format!("/operations/{operation_id}"))
            .await?;
        Ok(raw.into_operation(operation_id))
    }

    /// Fetch the current status of a website-bundling operation.
    pub async fn website_status(&self, operation_id: &str) -> Result<Operation, ItemError> {
        let raw: OperationStatusRaw = self
            .get_json(&format!("/websites/{operation_id}/status"))
            .await?;
        Ok(raw.into_operation(operation_id))
    }

    // ── Download + reference data ─────────────────────────────────────────

    /// Fetch an artifact's bytes and the `Content-Disposition` filename
    /// hint, when the service sends one.
    pub async fn download(&self, file_id: &str) -> Result<DownloadedArtifact, ItemError> {
        let response = self
            .client
            .get(self.url(&format!("/download/{file_id}")))
            .send()
            .await
            .map_err(ItemError::from_reqwest)?;
        let response = Self::check_status(response).await?;

        let suggested_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_filename);

        let bytes = response
            .bytes()
            .await
            .map_err(ItemError::from_reqwest)?
            .to_vec();
        debug!("Downloaded {} bytes for '{file_id}'", bytes.len());

        Ok(DownloadedArtifact {
            bytes,
            suggested_name,
        })
    }

    /// The service's source-format → target-formats matrix.
    pub async fn supported_conversions(&self) -> Result<HashMap<String, Vec<String>>, ItemError> {
        self.get_json("/supported-conversions").await
    }

    // ── Internals ─────────────────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ItemError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(ItemError::from_reqwest)?;
        Self::read_json(response).await
    }

    async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ItemError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(ItemError::from_reqwest)?;
        Self::read_json(response).await
    }

    /// Map a non-2xx response to [`ItemError::HttpStatus`], keeping the
    /// body text for display.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ItemError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ItemError::HttpStatus {
            status: status.as_u16(),
            detail,
        })
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ItemError> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await.map_err(ItemError::from_reqwest)?;
        serde_json::from_slice(&bytes).map_err(|e| ItemError::MalformedResponse {
            detail: e.to_string(),
        })
    }
}

/// Extract the `filename=` parameter from a `Content-Disposition` header
/// value. Handles the quoted and unquoted forms; the RFC 5987 `filename*=`
/// form is not used by the service and is ignored.
fn content_disposition_filename(value: &str) -> Option<String> {
    value.split(';').find_map(|part| {
        let part = part.trim();
        let rest = part.strip_prefix("filename=")?;
        let name = rest.trim_matches('"').trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}
