use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An organization, optionally part of a parent chain and optionally
/// backed by the organization reference vocabulary.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organization")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "JsonBinary")]
    pub pref_label: Json,
    /// Reference vocabulary URL; unique among reference-data rows so
    /// concurrent resolution converges on one row.
    #[sea_orm(unique)]
    pub url: Option<String>,
    pub external_identifier: Option<String>,
    pub email: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub homepage: Option<Json>,

    /// Self-referential `is_part_of` link.
    pub parent_id: Option<Uuid>,

    pub is_reference_data: bool,
    pub in_scheme: Option<String>,
    pub deprecated: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
