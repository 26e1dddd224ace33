//! # Sheetops - spreadsheet transformation orchestrator
//!
//! Sheetops drives a remote transformation service through five workflows:
//! compare, join, column merge, row split (unpivot) and duplicate detection.
//! Every workflow follows the same protocol: upload datasets, configure the
//! operation against their columns, preview as often as needed, then commit
//! once to get a downloadable artifact.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Upload    │────▶│  Registry   │────▶│  Builders   │────▶│   Client    │────▶│ Interpreter │
//! │ (two tiers) │     │ (per slot)  │     │ (validate)  │     │ (prev/comm) │     │ (normalize) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetops::{ClientConfig, Orchestrator, Slot};
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = Orchestrator::new(ClientConfig::default()).unwrap();
//!     orchestrator.upload_path(Slot::JoinLeft, "a.xlsx").await.unwrap();
//!     orchestrator.upload_path(Slot::JoinRight, "b.xlsx").await.unwrap();
//!     orchestrator.state().set_join_left(0, "id").unwrap();
//!     orchestrator.state().set_join_right(0, "id").unwrap();
//!     let result = orchestrator.commit_join().await.unwrap();
//!     println!("{:?}", result.stat("joinedRows"));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Service URL, timeout and preview limits
//! - [`models`] - Domain models (DatasetHandle, Slot, configs, OperationResult)
//! - [`registry`] - Dataset references per workflow slot
//! - [`upload`] - Two-tier upload protocol
//! - [`builders`] - Per-operation configuration builders
//! - [`api`] - Endpoints, wire types and HTTP client
//! - [`interpret`] - Service replies to results and previews
//! - [`activity`] - User-facing progress feed
//! - [`orchestrator`] - Session state and workflow sequencing

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Datasets
pub mod registry;
pub mod upload;

// Configuration
pub mod builders;

// Service
pub mod api;
pub mod interpret;

// Session
pub mod activity;
pub mod orchestrator;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, OperationError, OrchestratorResult, ServiceError, TransportError, UploadError,
    ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CompareConfig, CompareMode, DatasetHandle, DuplicateConfig, DuplicateMode, GroupId,
    JoinMapping, MergeGroup, Operation, OperationResult, Slot, SplitConfig,
};

// =============================================================================
// Re-exports - Builders
// =============================================================================

pub use builders::{
    CompareConfigBuilder, DuplicateConfigBuilder, JoinMappingBuilder, MergeGroupBuilder,
    SeparatorChoice, SplitConfigBuilder, SplitSide,
};

// =============================================================================
// Re-exports - Session
// =============================================================================

pub use activity::{ActivityFeed, LogEntry, LogLevel};
pub use api::TransformClient;
pub use config::ClientConfig;
pub use interpret::{OperationDetails, ResultInterpreter};
pub use orchestrator::{Orchestrator, OrchestratorState};
pub use registry::DatasetRegistry;
pub use upload::{UploadCoordinator, UploadFile};
