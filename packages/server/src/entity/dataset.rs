use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Normalized (V3) dataset row. Children hang off it relationally and are
/// replaced wholesale whenever the linked legacy record is converted.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dataset")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Language map, e.g. `{"en": "..."}`.
    #[sea_orm(column_type = "JsonBinary")]
    pub title: Json,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub description: Option<Json>,
    pub persistent_identifier: Option<String>,
    pub issued: Option<Date>,
    /// Plain string list.
    #[sea_orm(column_type = "JsonBinary")]
    pub keyword: Json,
    pub bibliographic_citation: Option<String>,

    pub created: DateTimeUtc,
    pub modified: DateTimeUtc,
    pub deprecated: Option<DateTimeUtc>,
    pub removed: Option<DateTimeUtc>,

    pub data_catalog: Option<String>,
    pub metadata_owner_user: Option<String>,
    pub metadata_owner_org: Option<String>,

    #[sea_orm(has_one)]
    pub access_rights: HasOne<super::access_rights::Entity>,
    #[sea_orm(has_many)]
    pub actors: HasMany<super::actor::Entity>,
    #[sea_orm(has_many)]
    pub provenance: HasMany<super::provenance::Entity>,
    #[sea_orm(has_many)]
    pub spatial_coverage: HasMany<super::spatial_coverage::Entity>,
    #[sea_orm(has_many)]
    pub temporal_coverage: HasMany<super::temporal_coverage::Entity>,
    #[sea_orm(has_many)]
    pub terms: HasMany<super::dataset_term::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
