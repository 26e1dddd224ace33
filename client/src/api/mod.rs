//! HTTP access to the transformation service.
//!
//! | Endpoint | Stage | Operation |
//! |---|---|---|
//! | `POST /api/upload` | upload | primary tier |
//! | `POST /api/simple-upload` | upload | lenient tier |
//! | `POST /api/upload-join` | upload | join slots |
//! | `POST /api/unmatched-rows` | preview | compare |
//! | `POST /api/compare-detailed` | commit | compare |
//! | `POST /api/suggest-join-columns` | preview | join |
//! | `POST /api/join` | commit | join |
//! | `POST /api/preview-merge` | preview | merge |
//! | `POST /api/merge-columns` | commit | merge |
//! | `POST /api/preview-split` | preview | split |
//! | `POST /api/split-rows` | commit | split |
//! | `POST /api/preview-duplicates` | preview | duplicate values |
//! | `POST /api/find-duplicate-values` | commit | duplicate values |
//! | `POST /api/find-duplicate-rows` | commit | duplicate rows |
//! | `GET /api/download/<name>` | - | artifacts |

pub mod client;
pub mod types;

use std::fmt;

pub use client::TransformClient;
pub use types::*;

/// Service endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Upload,
    SimpleUpload,
    UploadJoin,
    CompareDetailed,
    UnmatchedRows,
    Join,
    SuggestJoinColumns,
    PreviewMerge,
    MergeColumns,
    PreviewSplit,
    SplitRows,
    PreviewDuplicates,
    FindDuplicateValues,
    FindDuplicateRows,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Upload => "/api/upload",
            Endpoint::SimpleUpload => "/api/simple-upload",
            Endpoint::UploadJoin => "/api/upload-join",
            Endpoint::CompareDetailed => "/api/compare-detailed",
            Endpoint::UnmatchedRows => "/api/unmatched-rows",
            Endpoint::Join => "/api/join",
            Endpoint::SuggestJoinColumns => "/api/suggest-join-columns",
            Endpoint::PreviewMerge => "/api/preview-merge",
            Endpoint::MergeColumns => "/api/merge-columns",
            Endpoint::PreviewSplit => "/api/preview-split",
            Endpoint::SplitRows => "/api/split-rows",
            Endpoint::PreviewDuplicates => "/api/preview-duplicates",
            Endpoint::FindDuplicateValues => "/api/find-duplicate-values",
            Endpoint::FindDuplicateRows => "/api/find-duplicate-rows",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Prefix of artifact references returned by commits.
pub const DOWNLOAD_PREFIX: &str = "/api/download/";
