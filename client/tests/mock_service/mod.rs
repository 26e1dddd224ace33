//! In-process stand-in for the transformation service.
//!
//! Uploaded files are tiny CSV texts: the first non-comment line is the
//! header, every following line a row. Comment lines steer the mock:
//!
//! | Marker | Effect |
//! |---|---|
//! | `#strict-fail` | `/api/upload` rejects the file |
//! | `#lenient-fail` | `/api/simple-upload` rejects the file |
//! | `#join-fail` | `/api/upload-join` rejects the file |
//! | `#slow` | upload replies after 300 ms |
//! | `#server-error` | upload answers `500` with an HTML page |

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Map, Value};
use tokio::sync::Notify;

use sheetops::{ClientConfig, Orchestrator};

#[derive(Debug, Clone)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn parse(text: &str) -> Table {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        let columns = lines
            .next()
            .map(|h| h.split(',').map(|c| c.trim().to_string()).collect())
            .unwrap_or_default();
        let rows = lines
            .map(|l| l.split(',').map(|c| c.trim().to_string()).collect())
            .collect();
        Table { columns, rows }
    }

    fn index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    fn record(&self, row: &[String]) -> Map<String, Value> {
        self.columns
            .iter()
            .zip(row)
            .map(|(c, v)| (c.clone(), Value::String(v.clone())))
            .collect()
    }

    fn key(&self, row: &[String], columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .filter_map(|c| self.index(c))
            .map(|i| row[i].clone())
            .collect()
    }
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Table>,
    calls: Vec<(String, Value)>,
    uploads: usize,
}

#[derive(Clone, Default)]
pub struct Knobs {
    /// When set, `/api/join` waits for a notification before replying.
    pub join_gate: Option<Arc<Notify>>,
}

#[derive(Clone)]
struct AppState {
    inner: Arc<Mutex<Inner>>,
    knobs: Knobs,
}

impl AppState {
    fn record(&self, path: &str, body: Value) {
        self.inner.lock().unwrap().calls.push((path.to_string(), body));
    }

    fn table(&self, path: &Value) -> Option<Table> {
        let path = path.as_str()?;
        self.inner.lock().unwrap().tables.get(path).cloned()
    }
}

pub struct MockService {
    pub url: String,
    inner: Arc<Mutex<Inner>>,
}

impl MockService {
    pub async fn start() -> MockService {
        Self::start_with(Knobs::default()).await
    }

    pub async fn start_with(knobs: Knobs) -> MockService {
        let inner = Arc::new(Mutex::new(Inner::default()));
        let state = AppState {
            inner: inner.clone(),
            knobs,
        };

        let app = Router::new()
            .route("/api/upload", post(upload_primary))
            .route("/api/simple-upload", post(upload_lenient))
            .route("/api/upload-join", post(upload_join))
            .route("/api/compare-detailed", post(compare_detailed))
            .route("/api/unmatched-rows", post(unmatched_rows))
            .route("/api/join", post(join))
            .route("/api/suggest-join-columns", post(suggest_join_columns))
            .route("/api/preview-merge", post(preview_merge))
            .route("/api/merge-columns", post(merge_columns))
            .route("/api/preview-split", post(preview_split))
            .route("/api/split-rows", post(split_rows))
            .route("/api/preview-duplicates", post(preview_duplicates))
            .route("/api/find-duplicate-values", post(find_duplicate_values))
            .route("/api/find-duplicate-rows", post(find_duplicate_rows))
            .route("/api/download/{name}", get(download))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockService {
            url: format!("http://{}", addr),
            inner,
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        let config = ClientConfig::default().with_base_url(&self.url).unwrap();
        Orchestrator::new(config).unwrap()
    }

    /// Endpoint paths in call order.
    pub fn calls(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.calls.iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.calls().iter().filter(|p| p.as_str() == path).count()
    }

    /// Bodies received on `path`, oldest first.
    pub fn requests(&self, path: &str) -> Vec<Value> {
        let inner = self.inner.lock().unwrap();
        inner
            .calls
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

// =============================================================================
// Upload
// =============================================================================

async fn read_file(mut multipart: Multipart) -> Option<(String, String)> {
    while let Some(field) = multipart.next_field().await.ok()? {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("").to_string();
            let bytes = field.bytes().await.ok()?;
            return Some((name, String::from_utf8_lossy(&bytes).into_owned()));
        }
    }
    None
}

async fn store(state: &AppState, path: &str, multipart: Multipart, reject_marker: &str) -> Response {
    let Some((name, text)) = read_file(multipart).await else {
        state.record(path, json!({}));
        return Json(json!({"success": false, "error": "No file provided"})).into_response();
    };
    state.record(path, json!({ "filename": name }));

    if text.contains("#slow") {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    if text.contains("#server-error") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<html><body><h1>Internal Server Error</h1></body></html>"),
        )
            .into_response();
    }
    if text.contains(reject_marker) {
        return Json(json!({"success": false, "error": format!("Error reading file ({})", path)}))
            .into_response();
    }

    let table = Table::parse(&text);
    let mut inner = state.inner.lock().unwrap();
    inner.uploads += 1;
    let file_path = format!("uploads/{}_{}", inner.uploads, name);
    let reply = json!({
        "success": true,
        "filename": name,
        "rows": table.rows.len(),
        "columns": table.columns,
        "file_path": file_path,
    });
    inner.tables.insert(file_path, table);
    Json(reply).into_response()
}

async fn upload_primary(State(state): State<AppState>, multipart: Multipart) -> Response {
    store(&state, "/api/upload", multipart, "#strict-fail").await
}

async fn upload_lenient(State(state): State<AppState>, multipart: Multipart) -> Response {
    store(&state, "/api/simple-upload", multipart, "#lenient-fail").await
}

async fn upload_join(State(state): State<AppState>, multipart: Multipart) -> Response {
    store(&state, "/api/upload-join", multipart, "#join-fail").await
}

// =============================================================================
// Compare
// =============================================================================

/// Left rows whose key is absent from the right table.
fn unmatched(state: &AppState, body: &Value) -> Option<(Table, Table, Vec<usize>, String)> {
    let left = state.table(&body["file1_path"])?;
    let right = state.table(&body["file2_path"])?;
    let specific = body["compare_type"] == "specific_columns";
    let (left_cols, right_cols, label) = if specific {
        let c1 = body["col1"].as_str()?.to_string();
        let c2 = body["col2"].as_str()?.to_string();
        let label = format!("'{}' (File 1) vs '{}' (File 2)", c1, c2);
        (vec![c1], vec![c2], label)
    } else {
        (left.columns.clone(), right.columns.clone(), "All columns".to_string())
    };
    let keys: HashSet<Vec<String>> = right.rows.iter().map(|r| right.key(r, &right_cols)).collect();
    let missing = left
        .rows
        .iter()
        .enumerate()
        .filter(|(_, r)| !keys.contains(&left.key(r, &left_cols)))
        .map(|(i, _)| i)
        .collect();
    Some((left, right, missing, label))
}

fn unmatched_detail(table: &Table, index: usize) -> Value {
    json!({
        "excel_row": index + 2,
        "index": index,
        "data": table.record(&table.rows[index]),
    })
}

async fn compare_detailed(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/compare-detailed", body.clone());
    let Some((left, right, missing, label)) = unmatched(&state, &body) else {
        return Json(json!({"success": false, "error": "Missing file paths"}));
    };
    let matched = left.rows.len() - missing.len();
    let details: Vec<Value> = missing.iter().map(|&i| unmatched_detail(&left, i)).collect();
    Json(json!({
        "success": true,
        "message": "Comparison complete",
        "stats": {
            "file1_rows": left.rows.len(),
            "file2_rows": right.rows.len(),
            "matched_rows": matched,
            "unmatched_rows": missing.len(),
            "match_percentage": matched as f64 * 100.0 / left.rows.len().max(1) as f64,
            "compared_columns": label,
            "unmatched_indices": missing.iter().map(|i| i + 2).collect::<Vec<_>>(),
            "unmatched_data": details.iter().take(3).collect::<Vec<_>>(),
        },
        "unmatched_samples": details.iter().take(5).collect::<Vec<_>>(),
        "unmatched_count": missing.len(),
        "download_url": "/api/download/comparison_result.xlsx",
    }))
}

async fn unmatched_rows(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/unmatched-rows", body.clone());
    let Some((left, _, missing, _)) = unmatched(&state, &body) else {
        return Json(json!({"success": false, "error": "Missing file paths"}));
    };
    let details: Vec<Value> = missing.iter().map(|&i| unmatched_detail(&left, i)).collect();
    Json(json!({
        "success": true,
        "unmatched_count": details.len(),
        "unmatched_details": details,
    }))
}

// =============================================================================
// Join
// =============================================================================

async fn join(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/join", body.clone());
    if let Some(gate) = &state.knobs.join_gate {
        gate.notified().await;
    }
    let (Some(left), Some(right)) = (state.table(&body["file1_path"]), state.table(&body["file2_path"])) else {
        return Json(json!({"success": false, "error": "Missing file paths"}));
    };
    let pairs: Vec<(String, String)> = serde_json::from_value(body["join_columns"].clone()).unwrap_or_default();
    if pairs.is_empty() {
        return Json(json!({"success": false, "error": "No join columns specified"}));
    }
    let left_cols: Vec<String> = pairs.iter().map(|(l, _)| l.clone()).collect();
    let right_cols: Vec<String> = pairs.iter().map(|(_, r)| r.clone()).collect();
    let keys: HashSet<Vec<String>> = right.rows.iter().map(|r| right.key(r, &right_cols)).collect();
    let joined = left
        .rows
        .iter()
        .filter(|r| keys.contains(&left.key(r, &left_cols)))
        .count();
    Json(json!({
        "success": true,
        "stats": {
            "file1_rows": left.rows.len(),
            "file2_rows": right.rows.len(),
            "joined_rows": joined,
            "not_joined_rows": left.rows.len() - joined,
            "join_percentage": joined as f64 * 100.0 / left.rows.len().max(1) as f64,
            "join_columns": pairs,
        },
        "download_url": "/api/download/join_result.xlsx",
        "not_joined_download_url": "/api/download/not_joined.xlsx",
    }))
}

async fn suggest_join_columns(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/suggest-join-columns", body.clone());
    let (Some(left), Some(right)) = (state.table(&body["file1_path"]), state.table(&body["file2_path"])) else {
        return Json(json!({"success": false, "error": "Missing file paths"}));
    };
    let common: Vec<String> = left
        .columns
        .iter()
        .filter(|c| right.columns.contains(c))
        .cloned()
        .collect();
    let suggestions: Vec<(String, String)> = common.iter().map(|c| (c.clone(), c.clone())).collect();
    Json(json!({"success": true, "suggestions": suggestions, "common_columns": common}))
}

// =============================================================================
// Merge
// =============================================================================

fn merge_configs(body: &Value) -> Vec<(Vec<String>, String, String)> {
    serde_json::from_value(body["merge_configs"].clone()).unwrap_or_default()
}

fn final_columns(table: &Table, configs: &[(Vec<String>, String, String)]) -> usize {
    let used: HashSet<&String> = configs.iter().flat_map(|(cols, _, _)| cols).collect();
    table.columns.len() - used.len() + configs.len()
}

async fn preview_merge(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/preview-merge", body.clone());
    let Some(table) = state.table(&body["file_path"]) else {
        return Json(json!({"success": false, "error": "Missing file path"}));
    };
    let configs = merge_configs(&body);
    let preview: Vec<Value> = configs
        .iter()
        .map(|(cols, name, sep)| {
            let samples: Vec<Value> = table
                .rows
                .iter()
                .take(5)
                .map(|row| {
                    let values = table.key(row, cols);
                    let originals: Map<String, Value> = cols
                        .iter()
                        .cloned()
                        .zip(values.iter().cloned().map(Value::String))
                        .collect();
                    json!({"new_value": values.join(sep.as_str()), "original_values": originals})
                })
                .collect();
            json!({
                "original_columns": cols,
                "new_column": name,
                "separator": sep,
                "sample_data": samples,
            })
        })
        .collect();
    Json(json!({
        "success": true,
        "preview_data": preview,
        "original_columns_count": table.columns.len(),
        "final_columns_count": final_columns(&table, &configs),
        "total_merge_operations": configs.len(),
    }))
}

async fn merge_columns(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/merge-columns", body.clone());
    let Some(table) = state.table(&body["file_path"]) else {
        return Json(json!({"success": false, "error": "Missing file path"}));
    };
    let configs = merge_configs(&body);
    let final_count = final_columns(&table, &configs);
    let info: Vec<Value> = configs
        .iter()
        .map(|(cols, name, sep)| {
            let samples: Vec<String> = table.rows.iter().take(3).map(|r| table.key(r, cols).join(sep.as_str())).collect();
            json!({"original_columns": cols, "new_column": name, "separator": sep, "sample_data": samples})
        })
        .collect();
    Json(json!({
        "success": true,
        "stats": {
            "original_rows": table.rows.len(),
            "original_columns": table.columns.len(),
            "final_columns": final_count,
            "columns_removed": table.columns.len() as i64 - final_count as i64,
            "merge_operations": configs.len(),
            "merged_columns_info": info,
        },
        "download_url": "/api/download/merged_result.xlsx",
    }))
}

// =============================================================================
// Split
// =============================================================================

fn split_shape(table: &Table, body: &Value) -> (usize, usize) {
    let ids = body["id_columns"].as_array().map_or(0, Vec::len);
    let values = body["value_columns"].as_array().map_or(0, Vec::len);
    (table.rows.len() * values, ids + 2)
}

async fn preview_split(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/preview-split", body.clone());
    let Some(table) = state.table(&body["file_path"]) else {
        return Json(json!({"success": false, "error": "Missing file path"}));
    };
    let (rows, columns) = split_shape(&table, &body);
    Json(json!({
        "success": true,
        "preview_data": {
            "original_sample": table.rows.iter().take(5).map(|r| table.record(r)).collect::<Vec<_>>(),
            "split_sample": [],
            "original_stats": {"rows": table.rows.len(), "columns": table.columns.len()},
            "split_stats": {"rows": rows, "columns": columns},
            "transformation_ratio": rows as f64 / table.rows.len().max(1) as f64,
        }
    }))
}

async fn split_rows(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/split-rows", body.clone());
    let Some(table) = state.table(&body["file_path"]) else {
        return Json(json!({"success": false, "error": "Missing file path"}));
    };
    let (rows, columns) = split_shape(&table, &body);
    Json(json!({
        "success": true,
        "stats": {
            "original_rows": table.rows.len(),
            "original_columns": table.columns.len(),
            "final_rows": rows,
            "final_columns": columns,
            "rows_created": rows as i64 - table.rows.len() as i64,
            "id_columns": body["id_columns"],
            "value_columns": body["value_columns"],
            "var_name": body["var_name"],
            "value_name": body["value_name"],
        },
        "sample_data": [],
        "download_url": "/api/download/split_result.xlsx",
    }))
}

// =============================================================================
// Duplicates
// =============================================================================

/// Value → row indexes, for values seen more than once.
fn repeated(table: &Table, column: &str) -> Vec<(String, Vec<usize>)> {
    let Some(index) = table.index(column) else {
        return Vec::new();
    };
    let mut seen: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        match seen.iter_mut().find(|(v, _)| *v == row[index]) {
            Some((_, rows)) => rows.push(i),
            None => seen.push((row[index].clone(), vec![i])),
        }
    }
    seen.retain(|(_, rows)| rows.len() > 1);
    seen
}

fn requested_columns(body: &Value) -> Vec<String> {
    serde_json::from_value(body["columns"].clone()).unwrap_or_default()
}

async fn preview_duplicates(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/preview-duplicates", body.clone());
    let Some(table) = state.table(&body["file_path"]) else {
        return Json(json!({"success": false, "error": "Missing file path"}));
    };
    let columns = requested_columns(&body);
    let mut results = Map::new();
    let mut with_duplicates = Vec::new();
    for column in &columns {
        let groups = repeated(&table, column);
        if groups.is_empty() {
            continue;
        }
        with_duplicates.push(column.clone());
        let samples: Vec<Value> = groups
            .iter()
            .map(|(v, rows)| json!({"value": v, "count": rows.len(), "sample_rows": rows}))
            .collect();
        let total: usize = groups.iter().map(|(_, rows)| rows.len()).sum();
        results.insert(column.clone(), json!({"total_duplicates": total, "sample_duplicates": samples}));
    }
    Json(json!({
        "success": true,
        "preview_results": results,
        "checked_columns": columns,
        "columns_with_duplicates": with_duplicates,
        "sample_size": table.rows.len(),
    }))
}

async fn find_duplicate_values(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/find-duplicate-values", body.clone());
    let Some(table) = state.table(&body["file_path"]) else {
        return Json(json!({"success": false, "error": "Missing file path"}));
    };
    let columns = requested_columns(&body);
    let mut results = Map::new();
    let mut with_duplicates = Vec::new();
    let mut flagged = HashSet::new();
    for column in &columns {
        let groups = repeated(&table, column);
        if groups.is_empty() {
            continue;
        }
        with_duplicates.push(column.clone());
        flagged.extend(groups.iter().flat_map(|(_, rows)| rows.iter().copied()));
        let total: usize = groups.iter().map(|(_, rows)| rows.len()).sum();
        let wire: Vec<Value> = groups
            .iter()
            .map(|(v, rows)| {
                let excel: Vec<usize> = rows.iter().map(|r| r + 2).collect();
                json!({"value": v, "count": rows.len(), "rows": rows, "excel_rows": excel})
            })
            .collect();
        results.insert(
            column.clone(),
            json!({"total_duplicates": total, "unique_duplicate_values": groups.len(), "duplicate_groups": wire}),
        );
    }
    Json(json!({
        "success": true,
        "stats": {
            "original_rows": table.rows.len(),
            "checked_columns": columns,
            "columns_with_duplicates": with_duplicates,
            "total_duplicate_rows": flagged.len(),
            "duplicate_results": results,
        },
        "download_url": "/api/download/duplicate_values.xlsx",
    }))
}

async fn find_duplicate_rows(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/find-duplicate-rows", body.clone());
    let Some(table) = state.table(&body["file_path"]) else {
        return Json(json!({"success": false, "error": "Missing file path"}));
    };
    let mut groups: Vec<(Vec<String>, Vec<usize>)> = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        match groups.iter_mut().find(|(r, _)| r == row) {
            Some((_, rows)) => rows.push(i),
            None => groups.push((row.clone(), vec![i])),
        }
    }
    groups.retain(|(_, rows)| rows.len() > 1);
    let duplicate_rows: usize = groups.iter().map(|(_, rows)| rows.len()).sum();
    let wire: Vec<Value> = groups
        .iter()
        .map(|(row, rows)| {
            let excel: Vec<usize> = rows.iter().map(|r| r + 2).collect();
            json!({"row_data": table.record(row), "count": rows.len(), "rows": rows, "excel_rows": excel})
        })
        .collect();
    Json(json!({
        "success": true,
        "stats": {
            "original_rows": table.rows.len(),
            "duplicate_rows": duplicate_rows,
            "duplicate_groups": wire,
            "unique_duplicate_groups": groups.len(),
            "duplicate_percentage": duplicate_rows as f64 * 100.0 / table.rows.len().max(1) as f64,
        },
        "download_url": "/api/download/duplicate_rows.xlsx",
    }))
}

// =============================================================================
// Artifacts
// =============================================================================

async fn download(Path(name): Path<String>) -> Response {
    if name == "missing.xlsx" {
        return Json(json!({"success": false, "error": "File not found"})).into_response();
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        format!("artifact:{}", name).into_bytes(),
    )
        .into_response()
}
