//! Result interpretation.
//!
//! Turns decoded service replies into [`OperationResult`]s (commits) and
//! preview records. Wire names are mapped to canonical stat keys here and
//! nowhere else:
//!
//! | Operation | Stat keys |
//! |---|---|
//! | compare | `leftRows`, `rightRows`, `matched`, `unmatched`, `matchPct`, `comparedColumns`, `unmatchedCount` |
//! | join | `leftRows`, `rightRows`, `joinedRows`, `unjoinedRows`, `joinPct`, `joinMapping` |
//! | merge | `originalRows`, `originalColumns`, `finalColumns`, `columnsRemoved`, `mergeOperations` |
//! | split | `originalRows`, `originalColumns`, `finalRows`, `finalColumns`, `rowsCreated` |
//! | duplicate values | `originalRows`, `checkedColumns`, `columnsWithDuplicates`, `totalDuplicateRows` |
//! | duplicate rows | `originalRows`, `duplicateRows`, `uniqueGroups`, `duplicatePct` |
//!
//! A reply with `success: false` becomes a failed `OperationResult` for
//! commits and a [`ServiceError`] for previews.

mod summary;

pub use summary::*;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::api::*;
use crate::config::ClientConfig;
use crate::error::ServiceError;
use crate::models::{Operation, OperationResult};

/// First quoted name in a label like `'id' (File 1) vs 'code' (File 2)`.
static COMPARED_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'([^']+)'").expect("static regex is valid"));

// =============================================================================
// Field resolution
// =============================================================================

/// Unmatched rows of a compare reply, resolved from alternate fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedUnmatched {
    /// Detail rows as sent, not yet truncated.
    pub sample: Vec<UnmatchedRow>,
    /// Reported total. May exceed `sample.len()`.
    pub count: usize,
}

/// Resolve the unmatched detail of a compare reply.
///
/// Sample preference: top-level `unmatched_samples`, then
/// `stats.unmatched_data`. Count preference: top-level `unmatched_count`,
/// then `stats.unmatched_count`, then `stats.unmatched_rows`, else 0. The
/// count is never derived from the sample, which holds for commit replies
/// only; see [`ResultInterpreter::unmatched_listing`] for the full listing.
pub fn resolve_unmatched(body: &CompareBody) -> ResolvedUnmatched {
    let stats = body.stats.as_ref();
    let sample = body
        .unmatched_samples
        .clone()
        .or_else(|| stats.and_then(|s| s.unmatched_data.clone()))
        .unwrap_or_default();
    let count = body
        .unmatched_count
        .or_else(|| stats.and_then(|s| s.unmatched_count))
        .or_else(|| stats.and_then(|s| s.unmatched_rows))
        .unwrap_or(0);
    ResolvedUnmatched { sample, count }
}

/// Left column named in a compared-columns label.
pub fn compared_column(label: &str) -> Option<String> {
    COMPARED_COLUMN
        .captures(label)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

// =============================================================================
// Interpreter
// =============================================================================

/// Stateless translator from wire replies to results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultInterpreter {
    unmatched_preview_limit: usize,
    group_preview_limit: usize,
}

impl Default for ResultInterpreter {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl ResultInterpreter {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            unmatched_preview_limit: config.unmatched_preview_limit,
            group_preview_limit: config.duplicate_group_preview_limit,
        }
    }

    // -------------------------------------------------------------------------
    // Commits
    // -------------------------------------------------------------------------

    pub fn compare(&self, reply: Envelope<CompareBody>) -> OperationResult {
        let Some(mut result) = started(Operation::Compare, &reply) else {
            return failed(Operation::Compare, &reply);
        };
        let body = reply.body;
        let resolved = resolve_unmatched(&body);
        let stats = body.stats.unwrap_or_default();

        let mut sample = resolved.sample;
        sample.truncate(self.unmatched_preview_limit);
        let has_more_unmatched = resolved.count > sample.len();

        let summary = CompareSummary {
            left_rows: stats.file1_rows,
            right_rows: stats.file2_rows,
            matched: stats.matched_rows,
            unmatched: stats.unmatched_rows,
            match_pct: stats.match_percentage,
            highlighted_column: stats.compared_columns.as_deref().and_then(compared_column),
            compared_columns: stats.compared_columns.clone(),
            unmatched_count: resolved.count,
            unmatched_row_numbers: stats.unmatched_indices,
            unmatched_sample: sample,
            has_more_unmatched,
        };

        result.stats = stat_map([
            ("leftRows", Some(json!(summary.left_rows))),
            ("rightRows", Some(json!(summary.right_rows))),
            ("matched", summary.matched.map(|v| json!(v))),
            ("unmatched", summary.unmatched.map(|v| json!(v))),
            ("matchPct", summary.match_pct.map(|v| json!(v))),
            ("comparedColumns", summary.compared_columns.as_ref().map(|v| json!(v))),
            ("unmatchedCount", Some(json!(summary.unmatched_count))),
        ]);
        result.artifact_url = body.download_url;
        result.note = stats.note;
        result.details = Some(OperationDetails::Compare(summary));
        result
    }

    pub fn join(&self, reply: Envelope<JoinBody>) -> OperationResult {
        let Some(mut result) = started(Operation::Join, &reply) else {
            return failed(Operation::Join, &reply);
        };
        let body = reply.body;
        let stats = body.stats.unwrap_or_default();

        let summary = JoinSummary {
            left_rows: stats.file1_rows,
            right_rows: stats.file2_rows,
            joined_rows: stats.joined_rows,
            unjoined_rows: stats.not_joined_rows,
            join_pct: stats.join_percentage,
            join_mapping: stats.join_columns,
        };

        result.stats = stat_map([
            ("leftRows", Some(json!(summary.left_rows))),
            ("rightRows", Some(json!(summary.right_rows))),
            ("joinedRows", Some(json!(summary.joined_rows))),
            ("unjoinedRows", Some(json!(summary.unjoined_rows))),
            ("joinPct", Some(json!(summary.join_pct))),
            ("joinMapping", Some(json!(summary.join_mapping))),
        ]);
        result.artifact_url = body.download_url;
        result.secondary_artifact_url = body.not_joined_download_url;
        result.note = stats.note;
        result.details = Some(OperationDetails::Join(summary));
        result
    }

    pub fn merge(&self, reply: Envelope<MergeBody>) -> OperationResult {
        let Some(mut result) = started(Operation::Merge, &reply) else {
            return failed(Operation::Merge, &reply);
        };
        let body = reply.body;
        let stats = body.stats.unwrap_or_default();

        let summary = MergeSummary {
            original_rows: stats.original_rows,
            original_columns: stats.original_columns,
            final_columns: stats.final_columns,
            columns_removed: stats.columns_removed,
            merge_operations: stats.merge_operations,
            groups: stats
                .merged_columns_info
                .into_iter()
                .map(|info| MergedColumn {
                    source_columns: info.original_columns,
                    new_column: info.new_column,
                    separator: info.separator,
                    sample_values: info.sample_data,
                })
                .collect(),
        };

        result.stats = stat_map([
            ("originalRows", Some(json!(summary.original_rows))),
            ("originalColumns", Some(json!(summary.original_columns))),
            ("finalColumns", Some(json!(summary.final_columns))),
            ("columnsRemoved", Some(json!(summary.columns_removed))),
            ("mergeOperations", Some(json!(summary.merge_operations))),
        ]);
        result.artifact_url = body.download_url;
        result.note = stats.note;
        result.details = Some(OperationDetails::Merge(summary));
        result
    }

    pub fn split(&self, reply: Envelope<SplitBody>) -> OperationResult {
        let Some(mut result) = started(Operation::Split, &reply) else {
            return failed(Operation::Split, &reply);
        };
        let body = reply.body;
        let stats = body.stats.unwrap_or_default();

        let summary = SplitSummary {
            original_rows: stats.original_rows,
            original_columns: stats.original_columns,
            final_rows: stats.final_rows,
            final_columns: stats.final_columns,
            rows_created: stats.rows_created,
            id_columns: stats.id_columns,
            value_columns: stats.value_columns,
            variable_column_name: stats.var_name,
            value_column_name: stats.value_name,
            sample_rows: body.sample_data,
        };

        result.stats = stat_map([
            ("originalRows", Some(json!(summary.original_rows))),
            ("originalColumns", Some(json!(summary.original_columns))),
            ("finalRows", Some(json!(summary.final_rows))),
            ("finalColumns", Some(json!(summary.final_columns))),
            ("rowsCreated", Some(json!(summary.rows_created))),
        ]);
        result.artifact_url = body.download_url;
        result.note = stats.note;
        result.details = Some(OperationDetails::Split(summary));
        result
    }

    pub fn duplicate_values(&self, reply: Envelope<DuplicateValuesBody>) -> OperationResult {
        let Some(mut result) = started(Operation::DuplicateValues, &reply) else {
            return failed(Operation::DuplicateValues, &reply);
        };
        let body = reply.body;
        let mut stats = body.stats.unwrap_or_default();

        let order = column_order(&stats.columns_with_duplicates, stats.duplicate_results.keys());
        let per_column = order
            .into_iter()
            .filter_map(|column| {
                let wire = stats.duplicate_results.remove(&column)?;
                let group_count = wire.duplicate_groups.len();
                Some(ColumnDuplicates {
                    column,
                    total_duplicates: wire.total_duplicates,
                    unique_duplicate_values: wire.unique_duplicate_values,
                    groups: wire
                        .duplicate_groups
                        .into_iter()
                        .take(self.group_preview_limit)
                        .map(|g| ValueGroup {
                            value: g.value,
                            count: g.count,
                            excel_rows: g.excel_rows,
                        })
                        .collect(),
                    group_count,
                })
            })
            .collect();

        let summary = DuplicateValuesSummary {
            original_rows: stats.original_rows,
            checked_columns: stats.checked_columns,
            columns_with_duplicates: stats.columns_with_duplicates,
            total_duplicate_rows: stats.total_duplicate_rows,
            per_column,
        };

        result.stats = stat_map([
            ("originalRows", Some(json!(summary.original_rows))),
            ("checkedColumns", Some(json!(summary.checked_columns))),
            ("columnsWithDuplicates", Some(json!(summary.columns_with_duplicates))),
            ("totalDuplicateRows", Some(json!(summary.total_duplicate_rows))),
        ]);
        result.artifact_url = body.download_url;
        result.note = stats.note;
        result.details = Some(OperationDetails::DuplicateValues(summary));
        result
    }

    pub fn duplicate_rows(&self, reply: Envelope<DuplicateRowsBody>) -> OperationResult {
        let Some(mut result) = started(Operation::DuplicateRows, &reply) else {
            return failed(Operation::DuplicateRows, &reply);
        };
        let body = reply.body;
        let stats = body.stats.unwrap_or_default();

        let group_count = stats.duplicate_groups.len();
        let summary = DuplicateRowsSummary {
            original_rows: stats.original_rows,
            duplicate_rows: stats.duplicate_rows,
            unique_groups: stats.unique_duplicate_groups,
            duplicate_pct: stats.duplicate_percentage,
            groups: stats
                .duplicate_groups
                .into_iter()
                .take(self.group_preview_limit)
                .map(|g| RowGroup {
                    count: g.count,
                    row_data: g.row_data,
                    excel_rows: g.excel_rows,
                })
                .collect(),
            group_count,
        };

        result.stats = stat_map([
            ("originalRows", Some(json!(summary.original_rows))),
            ("duplicateRows", Some(json!(summary.duplicate_rows))),
            ("uniqueGroups", Some(json!(summary.unique_groups))),
            ("duplicatePct", Some(json!(summary.duplicate_pct))),
        ]);
        result.artifact_url = body.download_url;
        result.note = stats.note;
        result.details = Some(OperationDetails::DuplicateRows(summary));
        result
    }

    // -------------------------------------------------------------------------
    // Previews
    // -------------------------------------------------------------------------

    /// Full unmatched listing. This endpoint returns every unmatched row, so
    /// a missing `unmatched_count` is the listing length. Commit replies carry
    /// only a sample and go through [`resolve_unmatched`] instead.
    pub fn unmatched_listing(
        &self,
        reply: Envelope<UnmatchedRowsBody>,
    ) -> Result<UnmatchedListing, ServiceError> {
        let body = reply.into_body()?;
        Ok(UnmatchedListing {
            count: body.unmatched_count.unwrap_or(body.unmatched_details.len()),
            rows: body.unmatched_details,
        })
    }

    pub fn join_suggestions(
        &self,
        reply: Envelope<SuggestJoinBody>,
    ) -> Result<JoinSuggestions, ServiceError> {
        let body = reply.into_body()?;
        Ok(JoinSuggestions {
            pairs: body.suggestions,
            common_columns: body.common_columns,
        })
    }

    pub fn merge_preview(
        &self,
        reply: Envelope<MergePreviewBody>,
    ) -> Result<MergePreview, ServiceError> {
        let body = reply.into_body()?;
        Ok(MergePreview {
            groups: body
                .preview_data
                .into_iter()
                .map(|g| MergeGroupPreview {
                    original_columns: g.original_columns,
                    new_column: g.new_column,
                    separator: g.separator,
                    samples: g
                        .sample_data
                        .into_iter()
                        .map(|s| MergeSample {
                            new_value: s.new_value,
                            original_values: s.original_values,
                        })
                        .collect(),
                })
                .collect(),
            original_column_count: body.original_columns_count,
            final_column_count: body.final_columns_count,
            total_operations: body.total_merge_operations,
        })
    }

    pub fn split_preview(
        &self,
        reply: Envelope<SplitPreviewBody>,
    ) -> Result<SplitPreview, ServiceError> {
        let data = reply.into_body()?.preview_data.unwrap_or_default();
        Ok(SplitPreview {
            original_sample: data.original_sample,
            split_sample: data.split_sample,
            original_shape: data.original_stats,
            split_shape: data.split_stats,
            transformation_ratio: data.transformation_ratio,
        })
    }

    pub fn duplicate_preview(
        &self,
        reply: Envelope<DuplicatePreviewBody>,
    ) -> Result<DuplicatePreview, ServiceError> {
        let mut body = reply.into_body()?;
        let order = column_order(&body.columns_with_duplicates, body.preview_results.keys());
        let columns = order
            .into_iter()
            .filter_map(|column| {
                let wire = body.preview_results.remove(&column)?;
                Some(ColumnDuplicatePreview {
                    column,
                    total_duplicates: wire.total_duplicates,
                    samples: wire
                        .sample_duplicates
                        .into_iter()
                        .map(|s| DuplicateSample {
                            value: s.value,
                            count: s.count,
                            sample_rows: s.sample_rows,
                        })
                        .collect(),
                })
            })
            .collect();
        Ok(DuplicatePreview {
            sample_size: body.sample_size,
            checked_columns: body.checked_columns,
            columns,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Successful result shell carrying the reply's message, or `None` on failure.
fn started<T>(operation: Operation, reply: &Envelope<T>) -> Option<OperationResult> {
    if !reply.success {
        return None;
    }
    let mut result = OperationResult::succeeded(operation, Map::new());
    result.message = reply.message.clone();
    Some(result)
}

fn failed<T>(operation: Operation, reply: &Envelope<T>) -> OperationResult {
    OperationResult::failed(operation, reply.error_message())
}

fn stat_map<const N: usize>(entries: [(&str, Option<Value>); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect()
}

/// Listed columns first, then any other keys the service sent, sorted.
fn column_order<'a>(listed: &[String], keys: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut extra: Vec<String> = keys.filter(|k| !listed.contains(k)).cloned().collect();
    extra.sort();
    listed.iter().cloned().chain(extra).collect()
}
