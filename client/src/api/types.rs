//! Wire types for the transformation service.
//!
//! Requests are snake_case JSON. Responses share the [`Envelope`]
//! (`success`, `error`, `message`) and carry an endpoint-specific body
//! flattened next to it. Every response field is optional on the wire:
//! missing keys decode to their default instead of failing the whole reply.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ServiceError;
use crate::models::{
    CompareConfig, CompareMode, DatasetHandle, JoinMapping, MergeGroup, SplitConfig,
};

/// One table row as the service reports it.
pub type Row = Map<String, Value>;

// =============================================================================
// Envelope
// =============================================================================

/// Common outer shape of every JSON reply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Envelope<T> {
    pub success: bool,
    pub error: Option<String>,
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    /// The service's failure message, with a fallback when it sent none.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "Unknown error".to_string())
    }

    /// `Ok(body)` when `success`, otherwise the service's error.
    pub fn into_body(self) -> Result<T, ServiceError> {
        if self.success {
            Ok(self.body)
        } else {
            Err(ServiceError::new(self.error_message()))
        }
    }
}

/// Body for replies whose payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoBody {}

// =============================================================================
// Requests
// =============================================================================

/// Body of `compare-detailed` and `unmatched-rows`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareRequest {
    pub file1_path: String,
    pub file2_path: String,
    pub compare_type: CompareMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col2: Option<String>,
}

impl CompareRequest {
    pub fn new(left: &DatasetHandle, right: &DatasetHandle, config: &CompareConfig) -> Self {
        Self {
            file1_path: left.server_path.clone(),
            file2_path: right.server_path.clone(),
            compare_type: config.mode,
            col1: config.left_column.clone(),
            col2: config.right_column.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinRequest {
    pub file1_path: String,
    pub file2_path: String,
    pub join_columns: JoinMapping,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestJoinRequest {
    pub file1_path: String,
    pub file2_path: String,
}

/// `[source columns, new column name, separator]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeConfigWire(pub Vec<String>, pub String, pub String);

impl From<&MergeGroup> for MergeConfigWire {
    fn from(group: &MergeGroup) -> Self {
        MergeConfigWire(
            group.source_columns.clone(),
            group.new_column_name.clone(),
            group.separator.clone(),
        )
    }
}

/// Body of `preview-merge` and `merge-columns`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeRequest {
    pub file_path: String,
    pub merge_configs: Vec<MergeConfigWire>,
}

impl MergeRequest {
    pub fn new(dataset: &DatasetHandle, groups: &[MergeGroup]) -> Self {
        Self {
            file_path: dataset.server_path.clone(),
            merge_configs: groups.iter().map(MergeConfigWire::from).collect(),
        }
    }
}

/// Body of `preview-split` and `split-rows`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitRequest {
    pub file_path: String,
    pub id_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub var_name: String,
    pub value_name: String,
}

impl SplitRequest {
    pub fn new(dataset: &DatasetHandle, config: &SplitConfig) -> Self {
        Self {
            file_path: dataset.server_path.clone(),
            id_columns: config.id_columns.clone(),
            value_columns: config.value_columns.clone(),
            var_name: config.variable_column_name.clone(),
            value_name: config.value_column_name.clone(),
        }
    }
}

/// Body of `preview-duplicates` and `find-duplicate-values`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateValuesRequest {
    pub file_path: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateRowsRequest {
    pub file_path: String,
}

// =============================================================================
// Upload
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UploadBody {
    pub filename: Option<String>,
    pub rows: Option<usize>,
    pub columns: Vec<String>,
    pub file_path: Option<String>,
}

impl UploadBody {
    /// Build a handle, or explain which required field is missing.
    pub fn into_handle(self, slot: crate::models::Slot) -> Result<DatasetHandle, String> {
        let filename = self
            .filename
            .filter(|f| !f.is_empty())
            .ok_or("response has no filename")?;
        let server_path = self
            .file_path
            .filter(|p| !p.is_empty())
            .ok_or("response has no file_path")?;
        let row_count = self.rows.ok_or("response has no row count")?;
        if self.columns.is_empty() {
            return Err("response lists no columns".to_string());
        }
        Ok(DatasetHandle {
            slot,
            filename,
            server_path,
            row_count,
            columns: self.columns,
        })
    }
}

// =============================================================================
// Compare
// =============================================================================

/// One unmatched row from the left table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnmatchedRow {
    /// 1-based spreadsheet row number, header included.
    pub excel_row: usize,
    pub index: usize,
    pub data: Row,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compared_value: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompareStats {
    pub file1_rows: usize,
    pub file2_rows: usize,
    pub matched_rows: Option<usize>,
    pub unmatched_rows: Option<usize>,
    pub match_percentage: Option<f64>,
    /// e.g. `'id' (File 1) vs 'code' (File 2)`
    pub compared_columns: Option<String>,
    /// Spreadsheet row numbers, not 0-based indexes.
    pub unmatched_indices: Vec<usize>,
    pub unmatched_count: Option<usize>,
    pub unmatched_data: Option<Vec<UnmatchedRow>>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompareBody {
    pub stats: Option<CompareStats>,
    pub unmatched_samples: Option<Vec<UnmatchedRow>>,
    pub unmatched_count: Option<usize>,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UnmatchedRowsBody {
    pub unmatched_count: Option<usize>,
    pub unmatched_details: Vec<UnmatchedRow>,
}

// =============================================================================
// Join
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JoinStats {
    pub file1_rows: usize,
    pub file2_rows: usize,
    pub joined_rows: usize,
    pub not_joined_rows: usize,
    pub join_percentage: f64,
    pub join_columns: Vec<(String, String)>,
    pub not_joined_file: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JoinBody {
    pub stats: Option<JoinStats>,
    pub download_url: Option<String>,
    pub not_joined_download_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SuggestJoinBody {
    pub suggestions: Vec<(String, String)>,
    pub common_columns: Vec<String>,
}

// =============================================================================
// Merge
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MergeSampleWire {
    pub new_value: Value,
    pub original_values: Row,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MergeGroupPreviewWire {
    pub original_columns: Vec<String>,
    pub new_column: String,
    pub separator: String,
    pub sample_data: Vec<MergeSampleWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MergePreviewBody {
    pub preview_data: Vec<MergeGroupPreviewWire>,
    pub original_columns_count: usize,
    pub final_columns_count: usize,
    pub total_merge_operations: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MergedColumnInfo {
    pub original_columns: Vec<String>,
    pub new_column: String,
    pub separator: String,
    pub sample_data: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MergeStats {
    pub original_rows: usize,
    pub original_columns: usize,
    pub final_columns: usize,
    pub columns_removed: i64,
    pub merge_operations: usize,
    pub merged_columns_info: Vec<MergedColumnInfo>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MergeBody {
    pub stats: Option<MergeStats>,
    pub download_url: Option<String>,
}

// =============================================================================
// Split
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeStats {
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SplitPreviewData {
    pub original_sample: Vec<Row>,
    pub split_sample: Vec<Row>,
    pub original_stats: ShapeStats,
    pub split_stats: ShapeStats,
    pub transformation_ratio: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SplitPreviewBody {
    pub preview_data: Option<SplitPreviewData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SplitStats {
    pub original_rows: usize,
    pub original_columns: usize,
    pub final_rows: usize,
    pub final_columns: usize,
    pub rows_created: i64,
    pub id_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub var_name: String,
    pub value_name: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SplitBody {
    pub stats: Option<SplitStats>,
    pub sample_data: Vec<Row>,
    pub download_url: Option<String>,
}

// =============================================================================
// Duplicates
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SampleDuplicateWire {
    pub value: Value,
    pub count: usize,
    pub sample_rows: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColumnPreviewWire {
    pub total_duplicates: usize,
    pub sample_duplicates: Vec<SampleDuplicateWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DuplicatePreviewBody {
    pub preview_results: HashMap<String, ColumnPreviewWire>,
    pub checked_columns: Vec<String>,
    pub columns_with_duplicates: Vec<String>,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValueGroupWire {
    pub value: Value,
    pub count: usize,
    pub rows: Vec<usize>,
    pub excel_rows: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColumnDuplicatesWire {
    pub total_duplicates: usize,
    pub unique_duplicate_values: usize,
    pub duplicate_groups: Vec<ValueGroupWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DuplicateValuesStats {
    pub original_rows: usize,
    pub checked_columns: Vec<String>,
    pub columns_with_duplicates: Vec<String>,
    pub total_duplicate_rows: usize,
    pub duplicate_results: HashMap<String, ColumnDuplicatesWire>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DuplicateValuesBody {
    pub stats: Option<DuplicateValuesStats>,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RowGroupWire {
    pub row_data: Row,
    pub count: usize,
    pub rows: Vec<usize>,
    pub excel_rows: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DuplicateRowsStats {
    pub original_rows: usize,
    pub duplicate_rows: usize,
    pub duplicate_groups: Vec<RowGroupWire>,
    pub unique_duplicate_groups: usize,
    pub duplicate_percentage: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DuplicateRowsBody {
    pub stats: Option<DuplicateRowsStats>,
    pub download_url: Option<String>,
}
