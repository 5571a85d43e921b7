use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A person and/or organization attached to a dataset (or to a
/// provenance event as an associated actor).
///
/// One row per resolved (person, organization) identity; `roles` carries
/// the merged role set and `position` the first-appearance order.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actor")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// NULL for provenance association actors.
    pub dataset_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "dataset_id", to = "id")]
    pub dataset: BelongsTo<Option<super::dataset::Entity>>,

    pub provenance_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "provenance_id", to = "id")]
    pub provenance: BelongsTo<Option<super::provenance::Entity>>,

    /// String list, e.g. `["creator", "publisher"]`.
    #[sea_orm(column_type = "JsonBinary")]
    pub roles: Json,
    pub position: i32,

    pub person_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "person_id", to = "id")]
    pub person: BelongsTo<Option<super::person::Entity>>,

    pub organization_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "organization_id", to = "id")]
    pub organization: BelongsTo<Option<super::organization::Entity>>,
}

impl ActiveModelBehavior for ActiveModel {}
