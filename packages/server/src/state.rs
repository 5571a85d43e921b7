use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use adapter::{LegacySource, PipelineOptions};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DatabaseConnection,
    pub legacy: Arc<dyn LegacySource>,
    pub options: Arc<PipelineOptions>,
    /// Raised by the stop endpoint; running batch migrations check it
    /// between records.
    pub migration_stop: Arc<AtomicBool>,
}
