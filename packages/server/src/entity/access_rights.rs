use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "access_rights")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub dataset_id: Uuid,
    #[sea_orm(belongs_to, from = "dataset_id", to = "id")]
    pub dataset: HasOne<super::dataset::Entity>,

    pub access_type_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "access_type_id", to = "id")]
    pub access_type: BelongsTo<Option<super::term::Entity>>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub description: Option<Json>,
    pub available: Option<Date>,

    #[sea_orm(has_many)]
    pub licenses: HasMany<super::license::Entity>,
    #[sea_orm(has_many)]
    pub restriction_grounds: HasMany<super::access_rights_term::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
