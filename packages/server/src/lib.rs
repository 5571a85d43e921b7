pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Metadata Catalog API",
        version = "1.0.0",
        description = "Metadata catalog for research datasets, with a bidirectional adapter for legacy V1/V2 dataset documents"
    ),
    tags(
        (name = "Datasets", description = "Normalized dataset access"),
        (name = "Legacy datasets", description = "Legacy document storage, conversion and batch migration"),
    ),
)]
struct ApiDoc;

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .server
        .cors
        .allow_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .max_age(std::time::Duration::from_secs(
            state.config.server.cors.max_age,
        ))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    let cors = cors_layer(&state);
    router
        .with_state(state)
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;
    use crate::config::{AppConfig, CorsConfig, DatabaseConfig, LegacyConfig, ServerConfig};

    #[test]
    fn test_router_assembles_all_routes() {
        let state = AppState {
            config: AppConfig {
                server: ServerConfig {
                    host: "127.0.0.1".into(),
                    port: 3000,
                    cors: CorsConfig {
                        allow_origins: vec!["http://localhost:5173".into()],
                        max_age: 3600,
                    },
                },
                database: DatabaseConfig {
                    url: "postgres://unused".into(),
                },
                legacy: LegacyConfig {
                    api_url: "http://localhost:9999/rest/v2/datasets".into(),
                    page_size: 100,
                },
            },
            db: MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            legacy: Arc::new(adapter::StaticLegacySource::new(Vec::new(), 1)),
            options: Arc::new(adapter::PipelineOptions::default()),
            migration_stop: Arc::new(AtomicBool::new(false)),
        };
        let _router = build_router(state);
    }
}
