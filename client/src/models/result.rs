//! Interpreted outcome of a commit.

use serde::Serialize;
use serde_json::{Map, Value};

use super::Operation;
use crate::error::ServiceError;
use crate::interpret::OperationDetails;

/// Outcome of one commit, normalized from the service's response.
///
/// `success == false` always carries `error`. A successful result always
/// carries `stats`, keyed with the canonical names (`leftRows`,
/// `joinedRows`, `joinPct`, ...) regardless of the wire names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub operation: Operation,
    pub success: bool,
    pub stats: Map<String, Value>,
    /// Relative reference to the produced file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    /// Join only: rows that found no partner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_artifact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<OperationDetails>,
}

impl OperationResult {
    pub fn succeeded(operation: Operation, stats: Map<String, Value>) -> Self {
        Self {
            operation,
            success: true,
            stats,
            artifact_url: None,
            secondary_artifact_url: None,
            error: None,
            message: None,
            note: None,
            details: None,
        }
    }

    pub fn failed(operation: Operation, error: impl Into<String>) -> Self {
        Self {
            operation,
            success: false,
            stats: Map::new(),
            artifact_url: None,
            secondary_artifact_url: None,
            error: Some(error.into()),
            message: None,
            note: None,
            details: None,
        }
    }

    pub fn stat(&self, key: &str) -> Option<&Value> {
        self.stats.get(key)
    }

    /// Every artifact reference the result carries, primary first.
    pub fn artifact_urls(&self) -> impl Iterator<Item = &str> {
        self.artifact_url
            .as_deref()
            .into_iter()
            .chain(self.secondary_artifact_url.as_deref())
    }

    /// Turn a service-reported failure into an `Err` for `?` users.
    pub fn into_result(self) -> Result<Self, ServiceError> {
        if self.success {
            Ok(self)
        } else {
            Err(ServiceError::new(
                self.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}
