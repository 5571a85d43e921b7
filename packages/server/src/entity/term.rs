use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A controlled-vocabulary term shared between datasets.
///
/// `kind` + `url` identify a canonical term; rows minted during
/// migration for unknown codes carry `deprecated`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "term")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Discriminator, e.g. `access_type`, `license`, `location`.
    pub kind: String,
    pub url: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub pref_label: Json,
    pub in_scheme: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub definition: Option<Json>,
    pub deprecated: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
