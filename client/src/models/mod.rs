//! Domain models for the transformation workflows.
//!
//! - [`Slot`] - named position a dataset can be uploaded into
//! - [`Operation`] - the five transformations (duplicates split in two methods)
//! - [`DatasetHandle`] - server-side reference to an uploaded table
//! - [`CompareConfig`], [`JoinMapping`], [`MergeGroup`], [`SplitConfig`],
//!   [`DuplicateConfig`] - validated configurations produced by the builders
//! - [`OperationResult`] - interpreted outcome of a commit

mod result;

pub use result::OperationResult;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

// =============================================================================
// Slots & Operations
// =============================================================================

/// Named upload position. Each workflow owns its slots; the same file
/// uploaded for compare and for join lives in two different slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "compare.file1")]
    CompareLeft,
    #[serde(rename = "compare.file2")]
    CompareRight,
    #[serde(rename = "join.file1")]
    JoinLeft,
    #[serde(rename = "join.file2")]
    JoinRight,
    #[serde(rename = "merge.file")]
    Merge,
    #[serde(rename = "split.file")]
    Split,
    #[serde(rename = "duplicate.file")]
    Duplicate,
}

impl Slot {
    pub const ALL: [Slot; 7] = [
        Slot::CompareLeft,
        Slot::CompareRight,
        Slot::JoinLeft,
        Slot::JoinRight,
        Slot::Merge,
        Slot::Split,
        Slot::Duplicate,
    ];

    /// Stable key, e.g. `compare.file1`.
    pub fn key(&self) -> &'static str {
        match self {
            Slot::CompareLeft => "compare.file1",
            Slot::CompareRight => "compare.file2",
            Slot::JoinLeft => "join.file1",
            Slot::JoinRight => "join.file2",
            Slot::Merge => "merge.file",
            Slot::Split => "split.file",
            Slot::Duplicate => "duplicate.file",
        }
    }

    /// Join slots go through the dedicated join upload with no lenient retry.
    pub fn uses_lenient_fallback(&self) -> bool {
        !matches!(self, Slot::JoinLeft | Slot::JoinRight)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Committable operation. At most one commit per operation may be in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Compare,
    Join,
    Merge,
    Split,
    DuplicateValues,
    DuplicateRows,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Compare => "compare",
            Operation::Join => "join",
            Operation::Merge => "merge",
            Operation::Split => "split",
            Operation::DuplicateValues => "duplicate values",
            Operation::DuplicateRows => "duplicate rows",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Datasets
// =============================================================================

/// Reference to a table the service has stored.
///
/// `columns` is non-empty and ordered as the service reported them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetHandle {
    pub slot: Slot,
    pub filename: String,
    /// Opaque path used in every later request for this dataset.
    pub server_path: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl DatasetHandle {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fail with [`ValidationError::UnknownColumn`] unless `column` exists.
    pub fn ensure_column(&self, column: &str) -> ValidationResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(ValidationError::UnknownColumn {
                slot: self.slot,
                column: column.to_string(),
            })
        }
    }

    /// First `max` column names joined with ", ", with "..." when truncated.
    pub fn column_preview(&self, max: usize) -> String {
        let shown: Vec<&str> = self.columns.iter().take(max).map(String::as_str).collect();
        let mut preview = shown.join(", ");
        if self.columns.len() > max {
            preview.push_str("...");
        }
        preview
    }
}

// =============================================================================
// Compare
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompareMode {
    /// Every column of a row takes part in the match.
    #[default]
    #[serde(rename = "full_row")]
    WholeRow,
    /// One chosen column per side.
    #[serde(rename = "specific_columns")]
    SpecificColumns,
}

/// Validated compare configuration. Columns are set only in
/// [`CompareMode::SpecificColumns`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareConfig {
    pub mode: CompareMode,
    pub left_column: Option<String>,
    pub right_column: Option<String>,
}

// =============================================================================
// Join
// =============================================================================

/// Ordered, non-empty list of `(left column, right column)` pairs with no
/// blank entry on either side. Serializes as an array of 2-element arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct JoinMapping {
    pairs: Vec<(String, String)>,
}

impl JoinMapping {
    pub fn new(pairs: Vec<(String, String)>) -> ValidationResult<Self> {
        if pairs.is_empty() {
            return Err(ValidationError::EmptyJoinMapping);
        }
        let incomplete: Vec<usize> = pairs
            .iter()
            .enumerate()
            .filter(|(_, (l, r))| l.trim().is_empty() || r.trim().is_empty())
            .map(|(i, _)| i + 1)
            .collect();
        if !incomplete.is_empty() {
            return Err(ValidationError::IncompleteJoinPairs { incomplete });
        }
        Ok(Self { pairs })
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Always false for a constructed mapping.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

// =============================================================================
// Merge
// =============================================================================

/// Identifier of a merge group editor, unique within a builder's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "merge-group-{}", self.0)
    }
}

/// One complete merge group: at least one source column and a non-blank
/// output name. The separator may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeGroup {
    pub source_columns: Vec<String>,
    pub new_column_name: String,
    pub separator: String,
}

// =============================================================================
// Split
// =============================================================================

pub const DEFAULT_VARIABLE_COLUMN: &str = "Variable";
pub const DEFAULT_VALUE_COLUMN: &str = "Value";

/// Unpivot configuration. `id_columns` and `value_columns` are disjoint,
/// both non-empty and listed in dataset column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitConfig {
    pub id_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub variable_column_name: String,
    pub value_column_name: String,
}

// =============================================================================
// Duplicates
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMode {
    /// Repeated values inside chosen columns.
    ByValues,
    /// Fully identical rows.
    ByRows,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DuplicateConfig {
    ByValues { columns: Vec<String> },
    ByRows,
}

impl DuplicateConfig {
    pub fn mode(&self) -> DuplicateMode {
        match self {
            DuplicateConfig::ByValues { .. } => DuplicateMode::ByValues,
            DuplicateConfig::ByRows => DuplicateMode::ByRows,
        }
    }
}
