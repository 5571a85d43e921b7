use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/datasets", dataset_routes())
        .nest("/legacy-datasets", legacy_routes())
}

fn dataset_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::dataset::list_datasets))
        .routes(routes!(handlers::dataset::get_dataset))
}

fn legacy_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::legacy::get_legacy_dataset,
            handlers::legacy::save_legacy_dataset
        ))
        .routes(routes!(handlers::legacy::preview_conversion))
        .routes(routes!(handlers::legacy::migrate_legacy_datasets))
        .routes(routes!(handlers::legacy::stop_migration))
}
