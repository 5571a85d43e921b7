use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Join row linking an access-rights entry to a restriction-grounds term.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "access_rights_term")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub access_rights_id: Uuid,
    #[sea_orm(belongs_to, from = "access_rights_id", to = "id")]
    pub access_rights: HasOne<super::access_rights::Entity>,

    pub term_id: Uuid,
    #[sea_orm(belongs_to, from = "term_id", to = "id")]
    pub term: HasOne<super::term::Entity>,

    pub position: i32,
}

impl ActiveModelBehavior for ActiveModel {}
