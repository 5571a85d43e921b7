use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wrapper for one V1/V2 dataset document.
///
/// `raw_document` is preserved verbatim; every save re-derives the linked
/// dataset and the compatibility diff from it.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "legacy_record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "JsonBinary")]
    pub raw_document: Json,

    pub dataset_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "dataset_id", to = "id")]
    pub dataset: BelongsTo<Option<super::dataset::Entity>>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub compatibility_diff: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub migration_errors: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub invalid_legacy_values: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub fixed_legacy_values: Option<Json>,
    pub last_successful_migration: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
