use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "person")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,
    pub email: Option<String>,
    /// ORCID or similar external identifier.
    pub external_identifier: Option<String>,
    /// `{"url": ..., "title": {...}}`.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub homepage: Option<Json>,
}

impl ActiveModelBehavior for ActiveModel {}
