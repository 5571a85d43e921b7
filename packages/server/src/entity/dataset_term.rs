use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Join row linking a dataset to a shared vocabulary term.
///
/// `kind` distinguishes the association list: `field_of_science`, `theme`
/// or `language`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dataset_term")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub dataset_id: Uuid,
    #[sea_orm(belongs_to, from = "dataset_id", to = "id")]
    pub dataset: HasOne<super::dataset::Entity>,

    pub term_id: Uuid,
    #[sea_orm(belongs_to, from = "term_id", to = "id")]
    pub term: HasOne<super::term::Entity>,

    pub kind: String,
    pub position: i32,
}

impl ActiveModelBehavior for ActiveModel {}
