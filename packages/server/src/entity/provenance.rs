use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A provenance event of a dataset. The temporal range and the spatial
/// coverage of the event are embedded as columns; named variables and
/// associated actors are child rows.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "provenance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub dataset_id: Uuid,
    #[sea_orm(belongs_to, from = "dataset_id", to = "id")]
    pub dataset: HasOne<super::dataset::Entity>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub title: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub description: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub outcome_description: Option<Json>,

    pub event_outcome_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "event_outcome_id", to = "id", relation_enum = "EventOutcome")]
    pub event_outcome: BelongsTo<Option<super::term::Entity>>,
    pub lifecycle_event_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "lifecycle_event_id", to = "id", relation_enum = "LifecycleEvent")]
    pub lifecycle_event: BelongsTo<Option<super::term::Entity>>,
    pub preservation_event_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "preservation_event_id", to = "id", relation_enum = "PreservationEvent")]
    pub preservation_event: BelongsTo<Option<super::term::Entity>>,

    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub temporal_coverage: Option<String>,

    pub geographic_name: Option<String>,
    pub full_address: Option<String>,
    pub altitude_in_meters: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub custom_wkt: Option<Json>,
    pub location_id: Option<Uuid>,
    #[sea_orm(belongs_to, from = "location_id", to = "id", relation_enum = "Location")]
    pub location: BelongsTo<Option<super::term::Entity>>,
    /// True when the legacy entry carried a spatial sub-object at all.
    pub has_spatial: bool,
    /// True when the legacy entry carried a temporal sub-object at all.
    pub has_temporal: bool,

    pub position: i32,

    #[sea_orm(has_many)]
    pub variables: HasMany<super::provenance_variable::Entity>,
    #[sea_orm(has_many)]
    pub associated_actors: HasMany<super::actor::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
