//! Error types for the orchestration core.
//!
//! One enum per layer, converted upward with `From` so `?` works across
//! boundaries:
//!
//! - [`ValidationError`] - caught before any network call
//! - [`TransportError`] - network failure or malformed response
//! - [`ServiceError`] - well-formed response with `success: false`
//! - [`UploadError`] - outcome of the two-tier upload protocol
//! - [`OperationError`] - preview/commit orchestration errors
//! - [`ConfigError`] - client configuration errors
//!
//! None of these are fatal: every failure leaves the orchestrator in a state
//! where the same action can be issued again.

use thiserror::Error;

use crate::models::{GroupId, Operation, Slot};

// =============================================================================
// Validation Errors
// =============================================================================

/// Problems detected locally, before a request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No dataset has been uploaded into the slot yet.
    #[error("No dataset uploaded for {0}")]
    MissingDataset(Slot),

    /// Upload attempted without a file.
    #[error("No file selected for upload")]
    MissingFile,

    /// Column is not part of the dataset bound to the slot.
    #[error("Column '{column}' does not exist in {slot}")]
    UnknownColumn { slot: Slot, column: String },

    /// Specific-column compare without a column for one side.
    #[error("Select a column from {0} to compare")]
    MissingCompareColumn(Slot),

    /// Join mapping without any pair.
    #[error("At least one join pair is required")]
    EmptyJoinMapping,

    /// One or more join pairs lack a column on either side (1-based positions).
    #[error("Every join pair needs a column on both sides (incomplete pairs: {incomplete:?})")]
    IncompleteJoinPairs { incomplete: Vec<usize> },

    /// Removing the only join pair.
    #[error("At least one join pair must remain")]
    LastJoinPair,

    /// Join pair index out of range.
    #[error("Join pair {0} does not exist")]
    UnknownJoinPair(usize),

    /// Removing the only merge group.
    #[error("At least one merge group must remain")]
    LastMergeGroup,

    /// Merge group id not found.
    #[error("Merge group {0} does not exist")]
    UnknownMergeGroup(GroupId),

    /// Every merge group was filtered out as incomplete.
    #[error("Configure at least one merge group with selected columns and a new column name")]
    NoCompleteMergeGroup,

    /// Split without id columns.
    #[error("Select at least one id column")]
    EmptyIdColumns,

    /// Split without value columns.
    #[error("Select at least one value column to split")]
    EmptyValueColumns,

    /// Duplicate detection method not chosen.
    #[error("Choose a duplicate detection method first")]
    NoDuplicateMethod,

    /// Column checklist used outside the by-values method.
    #[error("Column selection is only available when searching duplicate values")]
    NotInValuesMode,

    /// Value-level duplicate search without columns.
    #[error("Select at least one column to check for duplicate values")]
    EmptyDuplicateColumns,
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Failures of the exchange itself, independent of what the service decided.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success status without a JSON envelope.
    #[error("Server error ({status}): {body}")]
    Status { status: u16, body: String },

    /// Body could not be decoded into the expected envelope.
    #[error("Malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },

    /// Local file could not be read.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Service Errors
// =============================================================================

/// The service answered with `success: false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Upload Errors
// =============================================================================

/// Errors from [`crate::upload::UploadCoordinator`].
#[derive(Debug, Error)]
pub enum UploadError {
    /// Nothing to upload.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Network or decoding failure on either tier.
    #[error("Connection error: {0}")]
    Transport(#[from] TransportError),

    /// Every tier available to the slot reported failure.
    #[error("Upload rejected: {}", .lenient.as_deref().unwrap_or(.primary.as_str()))]
    Rejected {
        primary: String,
        lenient: Option<String>,
    },

    /// A newer upload into the same slot was issued before this one resolved.
    #[error("Upload into {slot} was superseded by a newer upload")]
    Superseded { slot: Slot },
}

// =============================================================================
// Operation Errors
// =============================================================================

/// Errors from preview and commit calls.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection error: {0}")]
    Transport(#[from] TransportError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// A commit for the same operation has not resolved yet.
    #[error("A {0} commit is already in progress")]
    CommitInProgress(Operation),
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Service URL must start with http:// or https:// (got '{0}')")]
    InvalidServiceUrl(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type ValidationResult<T> = Result<T, ValidationError>;

pub type TransportResult<T> = Result<T, TransportError>;

pub type UploadResult<T> = Result<T, UploadError>;

pub type OrchestratorResult<T> = Result<T, OperationError>;
