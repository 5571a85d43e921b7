use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "spatial_coverage")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub dataset_id: Uuid,
    #[sea_orm(belongs_to, from = "dataset_id", to = "id")]
    pub dataset: HasOne<super::dataset::Entity>,

    pub geographic_name: Option<String>,
    pub full_address: Option<String>,
    pub altitude_in_meters: Option<String>,
    /// WKT strings supplied by the document, as a JSON string list.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub custom_wkt: Option<Json>,

    /// Location reference-data term.
    pub location_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "location_id", to = "id")]
    pub location: BelongsTo<Option<super::term::Entity>>,

    pub position: i32,
}

impl ActiveModelBehavior for ActiveModel {}
