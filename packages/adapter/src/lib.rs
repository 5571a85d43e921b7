//! Legacy dataset adapter: bidirectional conversion between the nested
//! V1/V2 `research_dataset` JSON shape and the normalized V3 dataset
//! graph, with entity resolution, round-trip reconstruction and an
//! advisory compatibility diff.

pub mod convert;
pub mod diff;
pub mod document;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod post_process;
pub mod resolver;
pub mod reverse;
pub mod store;

pub use convert::{Annotations, DatasetDraft, prepare};
pub use diff::{DiffOptions, DiffReport, diff};
pub use error::{ConversionError, EntryError, StoreError};
pub use graph::{DatasetGraph, LegacyRecord};
pub use orchestrator::{
    BatchFailure, BatchSummary, ConversionOutcome, MigrationSink, PipelineOptions, Preview,
    StoreSink, convert_preview, migrate_batch, migrate_stored, on_save,
};
pub use post_process::post_process;
pub use resolver::{ConvertOptions, ResolutionScope, Resolver};
pub use reverse::to_legacy_document;
pub use store::{CatalogStore, LegacyPage, LegacySource, MemoryStore, StaticLegacySource};
