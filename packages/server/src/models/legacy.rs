use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use adapter::graph::LegacyRecord;
use adapter::{BatchSummary, EntryError};

/// One legacy dataset wrapper with its migration bookkeeping.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LegacyRecordResponse {
    pub id: Uuid,
    /// Verbatim V1/V2 document.
    #[schema(value_type = Object)]
    pub raw_document: Value,
    /// Linked normalized dataset, set once a conversion succeeded.
    pub dataset_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub compatibility_diff: Option<Value>,
    #[schema(value_type = Object)]
    pub migration_errors: Option<Value>,
    #[schema(value_type = Object)]
    pub invalid_legacy_values: Option<Value>,
    #[schema(value_type = Object)]
    pub fixed_legacy_values: Option<Value>,
    pub last_successful_migration: Option<DateTime<Utc>>,
}

impl From<LegacyRecord> for LegacyRecordResponse {
    fn from(record: LegacyRecord) -> Self {
        Self {
            id: record.id,
            raw_document: record.raw_document,
            dataset_id: record.dataset_id,
            compatibility_diff: record.compatibility_diff,
            migration_errors: record.migration_errors,
            invalid_legacy_values: record.invalid_legacy_values,
            fixed_legacy_values: record.fixed_legacy_values,
            last_successful_migration: record.last_successful_migration,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EntryErrorBody {
    /// Dotted path of the offending legacy entry.
    pub path: String,
    pub detail: String,
}

impl From<&EntryError> for EntryErrorBody {
    fn from(error: &EntryError) -> Self {
        Self {
            path: error.path.clone(),
            detail: error.detail.clone(),
        }
    }
}

/// Dry-run conversion output; nothing was persisted.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PreviewResponse {
    pub dataset: super::dataset::DatasetResponse,
    pub errors: Vec<EntryErrorBody>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MigrateSource {
    /// Page through the configured remote V1/V2 API.
    #[default]
    Remote,
    /// Re-run conversion for legacy records already stored.
    Stored,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct MigrateRequest {
    #[serde(default)]
    pub source: MigrateSource,
    /// Maximum number of records to process in this invocation. For
    /// remote runs it is honored at page boundaries.
    pub limit: Option<usize>,
    /// Cursor returned by a previous remote invocation.
    pub cursor: Option<String>,
    /// Restrict a stored re-migration to one data catalog.
    pub data_catalog: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BatchFailureBody {
    pub identifier: Option<String>,
    pub detail: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MigrateResponse {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BatchFailureBody>,
    /// Cursor to resume from; absent when the source is exhausted.
    pub next_cursor: Option<String>,
    /// True when a cooperative stop cut the batch short.
    pub stopped: bool,
}

impl From<BatchSummary> for MigrateResponse {
    fn from(summary: BatchSummary) -> Self {
        Self {
            succeeded: summary.succeeded,
            failed: summary
                .failed
                .into_iter()
                .map(|f| BatchFailureBody {
                    identifier: f.identifier,
                    detail: f.detail,
                })
                .collect(),
            next_cursor: summary.next_cursor,
            stopped: summary.stopped,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StopResponse {
    /// True when a stop was requested; running batches finish the record
    /// in flight and then halt.
    pub stopping: bool,
}
