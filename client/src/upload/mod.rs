//! Two-tier upload protocol.
//!
//! ```text
//! compare/merge/split/duplicate slots:
//!   /api/upload ──ok──▶ install
//!        │ rejected or incomplete
//!        ▼
//!   /api/simple-upload ──ok──▶ install
//!        │ rejected or incomplete
//!        ▼
//!   UploadError::Rejected (registry untouched)
//!
//! join slots:
//!   /api/upload-join ──ok──▶ install
//!        │
//!        ▼
//!   UploadError::Rejected (no fallback)
//! ```
//!
//! A transport failure on any tier aborts immediately. The lenient tier is
//! only consulted when the service itself said no (or returned a handle with
//! no columns).

use std::path::Path;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::activity::{ActivityFeed, LogEntry};
use crate::api::{Endpoint, Envelope, TransformClient, UploadBody};
use crate::error::{TransportResult, UploadError, UploadResult, ValidationError};
use crate::models::{DatasetHandle, Slot};
use crate::orchestrator::{lock_state, OrchestratorState};

/// File payload as picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file; the file name becomes the upload name.
    pub async fn from_path(path: impl AsRef<Path>) -> TransportResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }
}

/// Which endpoint produced the installed handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTier {
    Primary,
    Lenient,
    Join,
}

/// Runs the upload protocol for one slot and installs the result.
pub struct UploadCoordinator<'a> {
    client: &'a TransformClient,
    activity: &'a ActivityFeed,
}

impl<'a> UploadCoordinator<'a> {
    pub fn new(client: &'a TransformClient, activity: &'a ActivityFeed) -> Self {
        Self { client, activity }
    }

    /// Upload `file` into `slot` and bind the resulting handle.
    ///
    /// On any error the registry keeps whatever handle the slot had before.
    /// If a newer upload into the same slot started meanwhile, this one
    /// returns [`UploadError::Superseded`] and installs nothing.
    pub async fn upload(
        &self,
        state: &Mutex<OrchestratorState>,
        slot: Slot,
        file: &UploadFile,
    ) -> UploadResult<DatasetHandle> {
        if file.name.trim().is_empty() {
            return Err(ValidationError::MissingFile.into());
        }

        let token = lock_state(state).registry.begin_upload(slot);
        self.activity.info(format!("📤 Uploading {} into {}...", file.name, slot));

        let (handle, tier) = match self.fetch(slot, file).await {
            Ok(found) => found,
            Err(e) => {
                self.activity.error(format!("Upload of {} failed: {}", file.name, e));
                return Err(e);
            }
        };

        if let Err(e) = lock_state(state).install(token, handle.clone()) {
            self.activity
                .warning(format!("Discarded {}: a newer upload into {} is pending", file.name, slot));
            return Err(e);
        }

        info!(slot = %slot, tier = ?tier, rows = handle.row_count, "dataset installed");
        self.activity.success(format!(
            "{} ready: {} rows, {} columns",
            handle.filename,
            handle.row_count,
            handle.columns.len()
        ));
        self.activity
            .log(LogEntry::info(format!("Columns: {}", handle.column_preview(5))).with_indent(1));
        Ok(handle)
    }

    /// Run the tiers available to `slot` without touching the registry.
    pub async fn fetch(&self, slot: Slot, file: &UploadFile) -> UploadResult<(DatasetHandle, UploadTier)> {
        if !slot.uses_lenient_fallback() {
            let reply = self.client.upload(Endpoint::UploadJoin, file).await?;
            return accept(reply, slot)
                .map(|h| (h, UploadTier::Join))
                .map_err(|primary| UploadError::Rejected {
                    primary,
                    lenient: None,
                });
        }

        let reply = self.client.upload(Endpoint::Upload, file).await?;
        let primary = match accept(reply, slot) {
            Ok(handle) => return Ok((handle, UploadTier::Primary)),
            Err(reason) => reason,
        };

        warn!(slot = %slot, reason = %primary, "primary upload rejected, trying lenient upload");
        self.activity
            .warning(format!("Standard upload failed ({}), retrying in simple mode", primary));

        let reply = self.client.upload(Endpoint::SimpleUpload, file).await?;
        accept(reply, slot)
            .map(|h| (h, UploadTier::Lenient))
            .map_err(|lenient| UploadError::Rejected {
                primary,
                lenient: Some(lenient),
            })
    }
}

/// A reply counts as a success only with a complete handle.
fn accept(reply: Envelope<UploadBody>, slot: Slot) -> Result<DatasetHandle, String> {
    if !reply.success {
        return Err(reply.error_message());
    }
    reply.body.into_handle(slot)
}
