use axum::Json;
use axum::extract::{Path, Query, State};
use sea_orm::*;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::dataset;
use crate::error::{AppError, ErrorBody};
use crate::models::dataset::*;
use crate::state::AppState;
use crate::store::SeaOrmStore;

#[utoipa::path(
    get,
    path = "/",
    tag = "Datasets",
    operation_id = "listDatasets",
    summary = "List normalized datasets",
    description = "Returns a paginated list of normalized datasets, newest modification first. Optionally filtered by data catalog identifier.",
    params(DatasetListQuery),
    responses(
        (status = 200, description = "List of datasets", body = DatasetListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_datasets(
    State(state): State<AppState>,
    Query(query): Query<DatasetListQuery>,
) -> Result<Json<DatasetListResponse>, AppError> {
    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut select = dataset::Entity::find();
    if let Some(ref catalog) = query.data_catalog {
        select = select.filter(dataset::Column::DataCatalog.eq(catalog));
    }
    select = select.order_by_desc(dataset::Column::Modified);

    let paginator = select.paginate(&state.db, per_page);
    let total = paginator.num_items().await?;
    let total_pages = total.div_ceil(per_page);

    let data = paginator
        .fetch_page(page - 1)
        .await?
        .into_iter()
        .map(|m| DatasetListItem {
            id: m.id,
            title: m.title,
            data_catalog: m.data_catalog,
            created: m.created,
            modified: m.modified,
        })
        .collect();

    Ok(Json(DatasetListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Datasets",
    operation_id = "getDataset",
    summary = "Get a normalized dataset by ID",
    description = "Returns the fully materialized dataset graph, including actors, provenance events, coverage entries and reference-data terms.",
    params(("id" = Uuid, Path, description = "Dataset ID")),
    responses(
        (status = 200, description = "Dataset details", body = DatasetResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_dataset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DatasetResponse>, AppError> {
    let store = SeaOrmStore::new(&state.db);
    let graph = adapter::CatalogStore::get_graph(&store, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Dataset '{id}' not found")))?;
    Ok(Json(DatasetResponse::from(&graph)))
}
