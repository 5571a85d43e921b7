use std::sync::atomic::Ordering;

use async_trait::async_trait;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::{Value, json};
use tracing::instrument;
use uuid::Uuid;

use adapter::graph::LegacyRecord;
use adapter::{
    CatalogStore, ConversionError, ConversionOutcome, MigrationSink, PipelineOptions, StoreError,
    convert_preview, migrate_batch, migrate_stored, on_save,
};

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::legacy::*;
use crate::state::AppState;
use crate::store::SeaOrmStore;

/// Sink wrapping every record in its own transaction so one failing
/// record rolls back alone.
struct TxnSink<'a> {
    db: &'a DatabaseConnection,
    options: &'a PipelineOptions,
}

#[async_trait]
impl MigrationSink for TxnSink<'_> {
    async fn migrate(
        &self,
        mut record: LegacyRecord,
    ) -> Result<ConversionOutcome, ConversionError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let store = SeaOrmStore::new(&txn);
        // Re-migrations keep the previously linked dataset.
        if let Some(existing) = store.get_legacy(record.id).await? {
            record.dataset_id = existing.dataset_id;
        }
        let outcome = on_save(&store, record, self.options).await?;
        txn.commit()
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(outcome)
    }
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Legacy datasets",
    operation_id = "getLegacyDataset",
    summary = "Get a legacy dataset record",
    description = "Returns the verbatim legacy document together with its migration bookkeeping: linked dataset, compatibility diff, collected entry errors and value annotations.",
    params(("id" = Uuid, Path, description = "Legacy record ID")),
    responses(
        (status = 200, description = "Legacy record", body = LegacyRecordResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_legacy_dataset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LegacyRecordResponse>, AppError> {
    let store = SeaOrmStore::new(&state.db);
    let record = store
        .get_legacy(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Legacy dataset '{id}' not found")))?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Legacy datasets",
    operation_id = "saveLegacyDataset",
    summary = "Create or update a legacy dataset record",
    description = "Stores the raw V1/V2 document and runs the full conversion pipeline: the normalized dataset is re-derived from scratch, the round-trip diff recomputed and the bookkeeping fields updated. The document's `identifier` must match the path ID; a missing identifier is filled in from the path.",
    params(("id" = Uuid, Path, description = "Legacy record ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Converted legacy record", body = LegacyRecordResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Conflicting entity fields (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, document))]
pub async fn save_legacy_dataset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(mut document): AppJson<Value>,
) -> Result<Json<LegacyRecordResponse>, AppError> {
    if document.get("identifier").is_none()
        && let Some(obj) = document.as_object_mut()
    {
        obj.insert("identifier".into(), json!(id.to_string()));
    }
    let mut record = LegacyRecord::from_document(document)?;
    if record.id != id {
        return Err(AppError::Validation(format!(
            "document identifier '{}' does not match path id '{}'",
            record.id, id
        )));
    }

    let txn = state.db.begin().await?;
    let store = SeaOrmStore::new(&txn);
    if let Some(existing) = store.get_legacy(record.id).await? {
        record.dataset_id = existing.dataset_id;
    }
    let outcome = on_save(&store, record, &state.options).await?;
    txn.commit().await?;

    Ok(Json(outcome.record.into()))
}

#[utoipa::path(
    post,
    path = "/preview",
    tag = "Legacy datasets",
    operation_id = "previewConversion",
    summary = "Preview the conversion of a legacy document",
    description = "Runs the conversion pipeline against a throwaway in-memory store and returns the would-be dataset plus collected entry errors. Nothing is persisted.",
    request_body = Object,
    responses(
        (status = 200, description = "Conversion preview", body = PreviewResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, document))]
pub async fn preview_conversion(
    State(state): State<AppState>,
    AppJson(document): AppJson<Value>,
) -> Result<Json<PreviewResponse>, AppError> {
    let preview = convert_preview(document, &state.options).await?;
    Ok(Json(PreviewResponse {
        dataset: (&preview.graph).into(),
        errors: preview.errors.iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/migrate",
    tag = "Legacy datasets",
    operation_id = "migrateLegacyDatasets",
    summary = "Migrate legacy datasets from the remote V1/V2 API",
    description = "Feeds legacy documents through the conversion pipeline, one transaction per record. With `source: remote` (default) it pages through the configured V1/V2 API; with `source: stored` it re-runs conversion for records already held locally. Failures are reported per record and never abort the batch. The limit is applied at page boundaries, and a resume cursor is returned whenever it cut a remote run short.",
    request_body = MigrateRequest,
    responses(
        (status = 200, description = "Batch summary", body = MigrateResponse),
        (status = 502, description = "Remote API failure (UPSTREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn migrate_legacy_datasets(
    State(state): State<AppState>,
    AppJson(payload): AppJson<MigrateRequest>,
) -> Result<Json<MigrateResponse>, AppError> {
    state.migration_stop.store(false, Ordering::Relaxed);
    let sink = TxnSink {
        db: &state.db,
        options: &state.options,
    };
    let limit = payload.limit.unwrap_or(usize::MAX);
    let summary = match payload.source {
        MigrateSource::Remote => {
            migrate_batch(
                state.legacy.as_ref(),
                &sink,
                limit,
                payload.cursor.as_deref(),
                &state.migration_stop,
            )
            .await?
        }
        MigrateSource::Stored => {
            let store = SeaOrmStore::new(&state.db);
            migrate_stored(
                &store,
                &sink,
                payload.data_catalog.as_deref(),
                limit,
                &state.migration_stop,
            )
            .await?
        }
    };
    Ok(Json(summary.into()))
}

#[utoipa::path(
    post,
    path = "/migrate/stop",
    tag = "Legacy datasets",
    operation_id = "stopMigration",
    summary = "Request a cooperative stop of the running migration",
    description = "Raises the stop flag; a running batch finishes the record in flight and then halts, reporting `stopped: true` in its summary.",
    responses(
        (status = 202, description = "Stop requested", body = StopResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn stop_migration(State(state): State<AppState>) -> impl IntoResponse {
    state.migration_stop.store(true, Ordering::Relaxed);
    (StatusCode::ACCEPTED, Json(StopResponse { stopping: true }))
}
