use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One license entry under an access-rights row: a vocabulary reference,
/// a free-form URL, or both.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "license")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub access_rights_id: Uuid,
    #[sea_orm(belongs_to, from = "access_rights_id", to = "id")]
    pub access_rights: HasOne<super::access_rights::Entity>,

    pub term_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "term_id", to = "id")]
    pub term: BelongsTo<Option<super::term::Entity>>,

    /// User-supplied title override.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub title: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub description: Option<Json>,
    pub custom_url: Option<String>,
    pub position: i32,
}

impl ActiveModelBehavior for ActiveModel {}
