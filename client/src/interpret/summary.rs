//! Presentation-ready records built from service responses.
//!
//! Commit details hang off [`OperationResult`](crate::models::OperationResult)
//! as [`OperationDetails`]; previews are returned on their own.

use serde::Serialize;
use serde_json::Value;

use crate::api::{Row, ShapeStats, UnmatchedRow};

// =============================================================================
// Commit details
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationDetails {
    Compare(CompareSummary),
    Join(JoinSummary),
    Merge(MergeSummary),
    Split(SplitSummary),
    DuplicateValues(DuplicateValuesSummary),
    DuplicateRows(DuplicateRowsSummary),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareSummary {
    pub left_rows: usize,
    pub right_rows: usize,
    pub matched: Option<usize>,
    pub unmatched: Option<usize>,
    pub match_pct: Option<f64>,
    pub compared_columns: Option<String>,
    /// Left column named in `compared_columns`, for highlighting.
    pub highlighted_column: Option<String>,
    /// Count as reported by the service, independent of the sample.
    pub unmatched_count: usize,
    /// At most the configured preview limit.
    pub unmatched_sample: Vec<UnmatchedRow>,
    /// Spreadsheet row numbers of every unmatched row (header is row 1).
    pub unmatched_row_numbers: Vec<usize>,
    pub has_more_unmatched: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSummary {
    pub left_rows: usize,
    pub right_rows: usize,
    pub joined_rows: usize,
    pub unjoined_rows: usize,
    pub join_pct: f64,
    pub join_mapping: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedColumn {
    pub source_columns: Vec<String>,
    pub new_column: String,
    pub separator: String,
    pub sample_values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    pub original_rows: usize,
    pub original_columns: usize,
    pub final_columns: usize,
    pub columns_removed: i64,
    pub merge_operations: usize,
    pub groups: Vec<MergedColumn>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitSummary {
    pub original_rows: usize,
    pub original_columns: usize,
    pub final_rows: usize,
    pub final_columns: usize,
    pub rows_created: i64,
    pub id_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub variable_column_name: String,
    pub value_column_name: String,
    pub sample_rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueGroup {
    pub value: Value,
    pub count: usize,
    /// Spreadsheet row numbers (header is row 1).
    pub excel_rows: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDuplicates {
    pub column: String,
    pub total_duplicates: usize,
    pub unique_duplicate_values: usize,
    /// At most the configured group preview limit.
    pub groups: Vec<ValueGroup>,
    pub group_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateValuesSummary {
    pub original_rows: usize,
    pub checked_columns: Vec<String>,
    pub columns_with_duplicates: Vec<String>,
    pub total_duplicate_rows: usize,
    /// In `columns_with_duplicates` order.
    pub per_column: Vec<ColumnDuplicates>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowGroup {
    pub count: usize,
    pub row_data: Row,
    pub excel_rows: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRowsSummary {
    pub original_rows: usize,
    pub duplicate_rows: usize,
    pub unique_groups: usize,
    pub duplicate_pct: f64,
    /// At most the configured group preview limit.
    pub groups: Vec<RowGroup>,
    pub group_count: usize,
}

// =============================================================================
// Previews
// =============================================================================

/// Full unmatched listing for a compare configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedListing {
    pub count: usize,
    pub rows: Vec<UnmatchedRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSuggestions {
    pub pairs: Vec<(String, String)>,
    pub common_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSample {
    pub new_value: Value,
    pub original_values: Row,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeGroupPreview {
    pub original_columns: Vec<String>,
    pub new_column: String,
    pub separator: String,
    pub samples: Vec<MergeSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePreview {
    pub groups: Vec<MergeGroupPreview>,
    pub original_column_count: usize,
    pub final_column_count: usize,
    pub total_operations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPreview {
    pub original_sample: Vec<Row>,
    pub split_sample: Vec<Row>,
    pub original_shape: ShapeStats,
    pub split_shape: ShapeStats,
    pub transformation_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateSample {
    pub value: Value,
    pub count: usize,
    pub sample_rows: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDuplicatePreview {
    pub column: String,
    pub total_duplicates: usize,
    pub samples: Vec<DuplicateSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatePreview {
    /// Rows the service inspected.
    pub sample_size: usize,
    pub checked_columns: Vec<String>,
    /// Only columns that have duplicates, in the service's order.
    pub columns: Vec<ColumnDuplicatePreview>,
}

impl DuplicatePreview {
    pub fn is_clean(&self) -> bool {
        self.columns.is_empty()
    }
}
