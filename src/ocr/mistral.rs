//! Mistral OCR backend.
//!
//! The service has no "post me a PDF, get markdown" endpoint; conversion is
//! a three-step flow:
//!
//! 1. `POST /v1/files` (multipart, `purpose=ocr`) — upload the document
//! 2. `GET /v1/files/{id}/url` — obtain a signed URL for the upload
//! 3. `POST /v1/ocr` — run the OCR model against the signed URL
//!
//! The response carries one Markdown string per page, plus any embedded
//! images as base64 payloads; pages are joined with blank lines and the
//! images are decoded for the batch writer to persist. Calls are
//! blocking-per-file with a single request timeout and no retries — the
//! batch is sequential by design, so the timeout is the only thing standing
//! between a hung connection and a stalled run.

use crate::document::InputDocument;
use crate::error::{BatchError, FileError};
use crate::ocr::{OcrEngine, OcrImage, OcrOutput};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Production API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.mistral.ai";

/// OCR backend talking to the Mistral API over HTTPS.
pub struct MistralOcr {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    url: String,
}

#[derive(Deserialize)]
struct OcrResponse {
    pages: Vec<OcrPage>,
}

#[derive(Deserialize)]
struct OcrPage {
    markdown: String,
    #[serde(default)]
    images: Vec<OcrPageImage>,
}

#[derive(Deserialize)]
struct OcrPageImage {
    id: String,
    /// Present only when the request asked for image data; some responses
    /// carry coordinates but no payload.
    image_base64: Option<String>,
}

impl MistralOcr {
    /// Create a client for the production endpoint.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, BatchError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BatchError::Internal(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs,
        })
    }

    /// Point the client at a different base URL (self-hosted gateways, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn transport_error(&self, e: &reqwest::Error) -> FileError {
        if e.is_timeout() {
            FileError::OcrTimeout {
                secs: self.timeout_secs,
            }
        } else {
            FileError::OcrTransport {
                detail: e.to_string(),
            }
        }
    }

    /// Map a non-success response to the matching [`FileError`].
    async fn status_error(&self, response: reqwest::Response) -> FileError {
        let status = response.status();
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        // Keep error bodies short in logs and reports.
        let detail = if detail.chars().count() > 200 {
            let head: String = detail.chars().take(199).collect();
            format!("{head}\u{2026}")
        } else {
            detail
        };

        match status.as_u16() {
            401 | 403 => FileError::OcrAuth { detail },
            429 => FileError::OcrQuota { detail },
            s => FileError::OcrApi { status: s, detail },
        }
    }

    async fn upload(&self, doc: &InputDocument, bytes: Vec<u8>) -> Result<String, FileError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(doc.file_name.clone())
            .mime_str("application/pdf")
            .map_err(|e| FileError::UploadFailed {
                file: doc.file_name.clone(),
                detail: e.to_string(),
            })?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "ocr")
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/v1/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let uploaded: UploadResponse =
            response.json().await.map_err(|e| FileError::UploadFailed {
                file: doc.file_name.clone(),
                detail: format!("malformed upload response: {e}"),
            })?;
        debug!("Uploaded {} as file id {}", doc.file_name, uploaded.id);
        Ok(uploaded.id)
    }

    async fn signed_url(&self, file_id: &str) -> Result<String, FileError> {
        let response = self
            .client
            .get(format!("{}/v1/files/{}/url", self.base_url, file_id))
            .query(&[("expiry", "24")])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let signed: SignedUrlResponse =
            response.json().await.map_err(|e| FileError::OcrTransport {
                detail: format!("malformed signed-url response: {e}"),
            })?;
        Ok(signed.url)
    }

    async fn run_ocr(&self, document_url: &str) -> Result<OcrResponse, FileError> {
        let body = serde_json::json!({
            "model": self.model,
            "document": {
                "type": "document_url",
                "document_url": document_url,
            },
            // Without this the response references images it never delivers.
            "include_image_base64": true,
        });

        let response = self
            .client
            .post(format!("{}/v1/ocr", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        response.json().await.map_err(|e| FileError::OcrTransport {
            detail: format!("malformed OCR response: {e}"),
        })
    }
}

#[async_trait]
impl OcrEngine for MistralOcr {
    async fn convert(&self, doc: &InputDocument, bytes: Vec<u8>) -> Result<OcrOutput, FileError> {
        let file_id = self.upload(doc, bytes).await?;
        let url = self.signed_url(&file_id).await?;
        let ocr = self.run_ocr(&url).await?;

        let images = decode_images(&ocr, &doc.file_name);
        info!(
            "OCR returned {} pages and {} images for {}",
            ocr.pages.len(),
            images.len(),
            doc.file_name
        );
        Ok(OcrOutput {
            markdown: join_pages(&ocr),
            images,
        })
    }
}

/// Concatenate per-page Markdown with blank lines between pages.
fn join_pages(response: &OcrResponse) -> String {
    response
        .pages
        .iter()
        .map(|p| p.markdown.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Decode every image payload in the response.
///
/// Images without data, or with data that does not decode, are dropped with
/// a warning; their Markdown references are left as the service wrote them.
fn decode_images(response: &OcrResponse, file_name: &str) -> Vec<OcrImage> {
    let mut images = Vec::new();
    for page in &response.pages {
        for img in &page.images {
            let Some(ref data) = img.image_base64 else {
                warn!("{}: image {} has no payload, skipping", file_name, img.id);
                continue;
            };
            // Payloads may arrive as a bare base64 string or a data URI.
            let data = data
                .rsplit_once("base64,")
                .map(|(_, tail)| tail)
                .unwrap_or(data);
            match BASE64.decode(data.trim()) {
                Ok(bytes) => images.push(OcrImage {
                    id: img.id.clone(),
                    bytes,
                }),
                Err(e) => warn!("{}: image {} failed to decode: {}", file_name, img.id, e),
            }
        }
    }
    images
}
