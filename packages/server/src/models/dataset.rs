use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use adapter::graph::DatasetGraph;

pub use super::shared::Pagination;

/// Full normalized dataset, children serialized as JSON blobs.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DatasetResponse {
    pub id: uuid::Uuid,
    /// Language map, e.g. `{"en": "..."}`.
    #[schema(value_type = Object)]
    pub title: Value,
    #[schema(value_type = Object)]
    pub description: Option<Value>,
    pub persistent_identifier: Option<String>,
    pub issued: Option<NaiveDate>,
    pub keyword: Vec<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub deprecated: Option<DateTime<Utc>>,
    pub removed: Option<DateTime<Utc>>,
    pub data_catalog: Option<String>,
    pub metadata_owner_user: Option<String>,
    pub metadata_owner_org: Option<String>,
    #[schema(value_type = Object)]
    pub access_rights: Option<Value>,
    #[schema(value_type = Object)]
    pub actors: Value,
    #[schema(value_type = Object)]
    pub provenance: Value,
    #[schema(value_type = Object)]
    pub spatial: Value,
    #[schema(value_type = Object)]
    pub temporal: Value,
    #[schema(value_type = Object)]
    pub field_of_science: Value,
    #[schema(value_type = Object)]
    pub theme: Value,
    #[schema(value_type = Object)]
    pub language: Value,
}

fn blob<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl From<&DatasetGraph> for DatasetResponse {
    fn from(graph: &DatasetGraph) -> Self {
        let d = &graph.dataset;
        Self {
            id: d.id,
            title: d.title.clone(),
            description: d.description.clone(),
            persistent_identifier: d.persistent_identifier.clone(),
            issued: d.issued,
            keyword: d.keyword.clone(),
            created: d.created,
            modified: d.modified,
            deprecated: d.deprecated,
            removed: d.removed,
            data_catalog: d.data_catalog.clone(),
            metadata_owner_user: d.metadata_owner.user.clone(),
            metadata_owner_org: d.metadata_owner.organization.clone(),
            access_rights: graph.access_rights.as_ref().map(blob),
            actors: blob(&graph.actors),
            provenance: blob(&graph.provenance),
            spatial: blob(&graph.spatial),
            temporal: blob(&graph.temporal),
            field_of_science: blob(&graph.field_of_science),
            theme: blob(&graph.theme),
            language: blob(&graph.language),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DatasetListItem {
    pub id: uuid::Uuid,
    #[schema(value_type = Object)]
    pub title: Value,
    pub data_catalog: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DatasetListResponse {
    pub data: Vec<DatasetListItem>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct DatasetListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Filter by data catalog identifier.
    pub data_catalog: Option<String>,
}
