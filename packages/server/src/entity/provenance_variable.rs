use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "provenance_variable")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub provenance_id: Uuid,
    #[sea_orm(belongs_to, from = "provenance_id", to = "id")]
    pub provenance: HasOne<super::provenance::Entity>,

    #[sea_orm(column_type = "JsonBinary")]
    pub pref_label: Json,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub description: Option<Json>,
    pub representation: Option<String>,

    pub concept_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "concept_id", to = "id", relation_enum = "Concept")]
    pub concept: BelongsTo<Option<super::term::Entity>>,
    pub universe_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "universe_id", to = "id", relation_enum = "Universe")]
    pub universe: BelongsTo<Option<super::term::Entity>>,

    pub position: i32,
}

impl ActiveModelBehavior for ActiveModel {}
