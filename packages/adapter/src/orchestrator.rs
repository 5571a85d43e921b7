//! Pipeline sequencing: prepare, post-process, reverse-map, diff.
//!
//! `on_save` is invoked by the persistence layer on every write of a
//! legacy record, not just the first: editing the raw document and
//! resaving fully re-derives the normalized dataset instead of patching
//! it. Batch migration feeds a paged remote source through the same path
//! with per-record failure isolation.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::json::get_str;

use crate::convert::{Annotations, prepare};
use crate::diff::{DiffOptions, DiffReport, diff};
use crate::document::LegacyDocument;
use crate::error::{ConversionError, EntryError, StoreError};
use crate::graph::{DatasetGraph, LegacyRecord};
use crate::post_process::post_process;
use crate::resolver::{ConvertOptions, ResolutionScope, Resolver};
use crate::store::{CatalogStore, LegacySource, MemoryStore};

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub convert: ConvertOptions,
    pub diff: DiffOptions,
}

/// Result of one full pipeline run.
pub struct ConversionOutcome {
    pub record: LegacyRecord,
    pub graph: DatasetGraph,
    /// Collected non-fatal post-process failures.
    pub errors: Vec<EntryError>,
    pub diff: DiffReport,
}

/// Run the full conversion pipeline for one legacy record.
///
/// Prepare failures abort before anything is written through the store;
/// post-process failures are collected and the successfully processed
/// subset still persists. The caller owns transaction scoping.
#[instrument(skip_all, fields(legacy_id = %record.id))]
pub async fn on_save<S: CatalogStore + ?Sized>(
    store: &S,
    mut record: LegacyRecord,
    options: &PipelineOptions,
) -> Result<ConversionOutcome, ConversionError> {
    let document = LegacyDocument::new(record.raw_document.clone())?;

    // Seed the resolution scope from the previously linked graph so a
    // re-run reuses existing rows instead of minting new ones.
    let mut scope = ResolutionScope::default();
    if let Some(dataset_id) = record.dataset_id
        && let Some(previous) = store.get_graph(dataset_id).await?
    {
        scope.seed_from_graph(&previous);
    }

    let mut resolver = Resolver::new(store, &options.convert, scope);
    let mut annotations = Annotations::default();

    let draft = prepare(&document, &mut resolver, &mut annotations).await?;
    let (graph, errors) = post_process(draft, &mut resolver, &mut annotations).await?;
    store.save_graph(&graph).await?;

    let reconstructed = crate::reverse::to_legacy_document(&graph);
    let report = diff(&record.raw_document, &reconstructed, &options.diff);

    record.dataset_id = Some(graph.dataset.id);
    record.compatibility_diff = Some(report.to_json());
    record.migration_errors = (!errors.is_empty())
        .then(|| serde_json::to_value(&errors).unwrap_or_default());
    record.invalid_legacy_values = annotations.invalid_json();
    record.fixed_legacy_values = annotations.fixed_json();
    record.last_successful_migration = Some(Utc::now());
    store.save_legacy(&record).await?;

    info!(
        dataset_id = %graph.dataset.id,
        entry_errors = errors.len(),
        diff_empty = report.is_empty(),
        "converted legacy record"
    );
    Ok(ConversionOutcome {
        record,
        graph,
        errors,
        diff: report,
    })
}

/// Preview output of [`convert_preview`].
pub struct Preview {
    pub graph: DatasetGraph,
    pub errors: Vec<EntryError>,
}

/// Dry-run conversion of a raw legacy document against a throwaway
/// in-memory store. Nothing is persisted.
pub async fn convert_preview(
    document: Value,
    options: &PipelineOptions,
) -> Result<Preview, ConversionError> {
    let store = MemoryStore::new();
    let record = LegacyRecord::from_document(document)?;
    let outcome = on_save(&store, record, options).await?;
    Ok(Preview {
        graph: outcome.graph,
        errors: outcome.errors,
    })
}

/// Per-record entry point used by batch migration. The relational
/// implementation wraps each call in its own transaction so one failing
/// record cannot poison its neighbors.
#[async_trait]
pub trait MigrationSink: Send + Sync {
    async fn migrate(&self, record: LegacyRecord) -> Result<ConversionOutcome, ConversionError>;
}

/// Sink running directly against one store, without extra transaction
/// scoping. Suitable for tests and the in-memory store.
pub struct StoreSink<'a, S: CatalogStore + ?Sized> {
    pub store: &'a S,
    pub options: &'a PipelineOptions,
}

#[async_trait]
impl<'a, S: CatalogStore + ?Sized> MigrationSink for StoreSink<'a, S> {
    async fn migrate(&self, record: LegacyRecord) -> Result<ConversionOutcome, ConversionError> {
        on_save(self.store, record, self.options).await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Identifier claimed by the document, when one was present.
    pub identifier: Option<String>,
    pub detail: String,
}

/// Outcome of one batch-migration invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BatchFailure>,
    /// Cursor to resume from, `None` when the source is exhausted.
    pub next_cursor: Option<String>,
    /// True when a cooperative stop cut the batch short.
    pub stopped: bool,
}

/// Page through a remote legacy source, feeding every document through
/// the sink. Individual failures are reported, never fatal; source-level
/// errors (network, bad cursor) abort the batch.
///
/// The limit is applied at page boundaries: a fetched page is always
/// drained, so `next_cursor` covers every record the run did not process.
#[instrument(skip_all, fields(limit))]
pub async fn migrate_batch(
    source: &(impl LegacySource + ?Sized),
    sink: &(impl MigrationSink + ?Sized),
    limit: usize,
    cursor: Option<&str>,
    stop: &AtomicBool,
) -> Result<BatchSummary, StoreError> {
    let mut summary = BatchSummary::default();
    let mut cursor = cursor.map(str::to_string);
    let mut processed = 0usize;

    'pages: loop {
        let page = source.fetch_page(cursor.as_deref()).await?;
        for document in page.documents {
            // stop checks sit between records, never mid-record
            if stop.load(Ordering::Relaxed) {
                summary.stopped = true;
                break 'pages;
            }
            processed += 1;
            let identifier = get_str(&document, "identifier").map(str::to_string);
            match LegacyRecord::from_document(document) {
                Ok(record) => match sink.migrate(record).await {
                    Ok(outcome) => summary.succeeded.push(outcome.record.id),
                    Err(error) => {
                        warn!(?identifier, %error, "legacy record failed to migrate");
                        summary.failed.push(BatchFailure {
                            identifier,
                            detail: error.to_string(),
                        });
                    }
                },
                Err(error) => {
                    warn!(?identifier, %error, "legacy document rejected");
                    summary.failed.push(BatchFailure {
                        identifier,
                        detail: error.to_string(),
                    });
                }
            }
        }
        // the page is fully consumed before the limit is checked, so the
        // cursor never hides skipped records behind an exhausted-looking
        // summary
        match page.next {
            Some(next) if processed < limit => cursor = Some(next),
            next => {
                summary.next_cursor = next;
                break;
            }
        }
    }

    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        stopped = summary.stopped,
        "batch migration finished"
    );
    Ok(summary)
}

/// Re-run the conversion pipeline for legacy records already held in the
/// store, optionally restricted to one data catalog. Used after mapper
/// changes to refresh derived datasets and diffs without refetching.
#[instrument(skip_all, fields(limit, catalog))]
pub async fn migrate_stored<S: CatalogStore + ?Sized>(
    store: &S,
    sink: &(impl MigrationSink + ?Sized),
    catalog: Option<&str>,
    limit: usize,
    stop: &AtomicBool,
) -> Result<BatchSummary, StoreError> {
    let mut summary = BatchSummary::default();
    let mut processed = 0usize;

    for id in store.list_legacy_ids(catalog).await? {
        if stop.load(Ordering::Relaxed) {
            summary.stopped = true;
            break;
        }
        if processed >= limit {
            break;
        }
        processed += 1;
        let Some(record) = store.get_legacy(id).await? else {
            continue;
        };
        match sink.migrate(record).await {
            Ok(outcome) => summary.succeeded.push(outcome.record.id),
            Err(error) => {
                warn!(%id, %error, "stored legacy record failed to re-migrate");
                summary.failed.push(BatchFailure {
                    identifier: Some(id.to_string()),
                    detail: error.to_string(),
                });
            }
        }
    }

    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        stopped = summary.stopped,
        "stored re-migration finished"
    );
    Ok(summary)
}
