//! HTTP client for the transformation service.
//!
//! Each method issues exactly one request and returns the decoded
//! [`Envelope`]. Whether `success` is true is left to the caller; only
//! failures of the exchange itself surface as [`TransportError`].
//!
//! A non-2xx reply whose body still decodes as an envelope (the service
//! answers oversize uploads with a JSON error) is returned like any other
//! reply.

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::types::*;
use super::{Endpoint, DOWNLOAD_PREFIX};
use crate::config::ClientConfig;
use crate::error::{TransportError, TransportResult};
use crate::upload::UploadFile;

/// Longest body excerpt kept in a `TransportError::Status`.
const MAX_ERROR_BODY: usize = 300;

/// Client for one transformation service.
#[derive(Debug, Clone)]
pub struct TransformClient {
    http: reqwest::Client,
    base_url: String,
}

impl TransformClient {
    pub fn new(config: &ClientConfig) -> TransportResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Absolute URL for an artifact reference. Already absolute references
    /// are returned unchanged.
    pub fn resolve_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else if reference.starts_with('/') {
            self.url(reference)
        } else {
            self.url(&format!("{}{}", DOWNLOAD_PREFIX, reference))
        }
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Send `file` as multipart field `file` to one of the upload endpoints.
    pub async fn upload(
        &self,
        endpoint: Endpoint,
        file: &UploadFile,
    ) -> TransportResult<Envelope<UploadBody>> {
        debug!(endpoint = %endpoint, file = %file.name, bytes = file.bytes.len(), "uploading");
        let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        let form = Form::new().part("file", part);
        let response = self
            .http
            .post(self.url(endpoint.path()))
            .multipart(form)
            .send()
            .await?;
        read_envelope(endpoint, response).await
    }

    // =========================================================================
    // Compare
    // =========================================================================

    pub async fn compare(&self, request: &CompareRequest) -> TransportResult<Envelope<CompareBody>> {
        self.post_json(Endpoint::CompareDetailed, request).await
    }

    pub async fn unmatched_rows(
        &self,
        request: &CompareRequest,
    ) -> TransportResult<Envelope<UnmatchedRowsBody>> {
        self.post_json(Endpoint::UnmatchedRows, request).await
    }

    // =========================================================================
    // Join
    // =========================================================================

    pub async fn join(&self, request: &JoinRequest) -> TransportResult<Envelope<JoinBody>> {
        self.post_json(Endpoint::Join, request).await
    }

    pub async fn suggest_join_columns(
        &self,
        request: &SuggestJoinRequest,
    ) -> TransportResult<Envelope<SuggestJoinBody>> {
        self.post_json(Endpoint::SuggestJoinColumns, request).await
    }

    // =========================================================================
    // Merge
    // =========================================================================

    pub async fn preview_merge(
        &self,
        request: &MergeRequest,
    ) -> TransportResult<Envelope<MergePreviewBody>> {
        self.post_json(Endpoint::PreviewMerge, request).await
    }

    pub async fn merge_columns(&self, request: &MergeRequest) -> TransportResult<Envelope<MergeBody>> {
        self.post_json(Endpoint::MergeColumns, request).await
    }

    // =========================================================================
    // Split
    // =========================================================================

    pub async fn preview_split(
        &self,
        request: &SplitRequest,
    ) -> TransportResult<Envelope<SplitPreviewBody>> {
        self.post_json(Endpoint::PreviewSplit, request).await
    }

    pub async fn split_rows(&self, request: &SplitRequest) -> TransportResult<Envelope<SplitBody>> {
        self.post_json(Endpoint::SplitRows, request).await
    }

    // =========================================================================
    // Duplicates
    // =========================================================================

    pub async fn preview_duplicates(
        &self,
        request: &DuplicateValuesRequest,
    ) -> TransportResult<Envelope<DuplicatePreviewBody>> {
        self.post_json(Endpoint::PreviewDuplicates, request).await
    }

    pub async fn find_duplicate_values(
        &self,
        request: &DuplicateValuesRequest,
    ) -> TransportResult<Envelope<DuplicateValuesBody>> {
        self.post_json(Endpoint::FindDuplicateValues, request).await
    }

    pub async fn find_duplicate_rows(
        &self,
        request: &DuplicateRowsRequest,
    ) -> TransportResult<Envelope<DuplicateRowsBody>> {
        self.post_json(Endpoint::FindDuplicateRows, request).await
    }

    // =========================================================================
    // Artifacts
    // =========================================================================

    /// Fetch the bytes behind an artifact reference such as
    /// `/api/download/join_result_a.xlsx`.
    pub async fn download(&self, reference: &str) -> TransportResult<Vec<u8>> {
        let url = self.resolve_url(reference);
        debug!(url = %url, "downloading artifact");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }
        // The service reports a missing file as a 200 JSON error.
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        let bytes = response.bytes().await?.to_vec();
        if is_json {
            if let Ok(env) = serde_json::from_slice::<Envelope<NoBody>>(&bytes) {
                if !env.success {
                    return Err(TransportError::Status {
                        status: status.as_u16(),
                        body: env.error_message(),
                    });
                }
            }
        }
        Ok(bytes)
    }

    async fn post_json<Req, T>(&self, endpoint: Endpoint, request: &Req) -> TransportResult<Envelope<T>>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        debug!(endpoint = %endpoint, "POST");
        let response = self
            .http
            .post(self.url(endpoint.path()))
            .json(request)
            .send()
            .await?;
        read_envelope(endpoint, response).await
    }
}

async fn read_envelope<T>(endpoint: Endpoint, response: reqwest::Response) -> TransportResult<Envelope<T>>
where
    T: DeserializeOwned + Default,
{
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) => {
            if !status.is_success() {
                warn!(endpoint = %endpoint, status = status.as_u16(), "error status with JSON body");
            }
            Ok(envelope)
        }
        Err(_) if !status.is_success() => Err(TransportError::Status {
            status: status.as_u16(),
            body: excerpt(&body),
        }),
        Err(e) => Err(TransportError::Malformed {
            endpoint: endpoint.path().to_string(),
            message: e.to_string(),
        }),
    }
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", cut)
    }
}
