//! Configuration builders.
//!
//! One builder per workflow holds the user's in-progress choices and turns
//! them into a validated configuration:
//!
//! - [`CompareConfigBuilder`] - mode and optional column per side
//! - [`JoinMappingBuilder`] - ordered pair editors, never fewer than one
//! - [`MergeGroupBuilder`] - merge group editors and the shared separator
//! - [`SplitConfigBuilder`] - mutually exclusive id/value column sets
//! - [`DuplicateConfigBuilder`] - detection method and column checklist
//!
//! Builders never talk to the network. They validate against the columns of
//! the dataset they were reset for; the orchestrator resets them whenever a
//! new dataset lands in their slot.

pub mod compare;
pub mod duplicate;
pub mod join;
pub mod merge;
pub mod split;

pub use compare::CompareConfigBuilder;
pub use duplicate::DuplicateConfigBuilder;
pub use join::{JoinMappingBuilder, JoinPairEditor};
pub use merge::{separator_label, MergeGroupBuilder, MergeGroupDraft, SeparatorChoice};
pub use split::{SplitConfigBuilder, SplitSide};

use crate::error::ValidationResult;
use crate::models::DatasetHandle;

/// A dropdown choice: empty means "nothing selected", anything else must be
/// a column of `dataset`.
fn checked_choice(dataset: &DatasetHandle, column: &str) -> ValidationResult<Option<String>> {
    if column.is_empty() {
        return Ok(None);
    }
    dataset.ensure_column(column)?;
    Ok(Some(column.to_string()))
}
