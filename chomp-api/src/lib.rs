//! Query/analytics HTTP surface (spec.md §4.9), grounded on
//! `cloud-component-service/src/api/mod.rs`'s `combined_routes`/
//! `make_open_api_service` pattern: one `OpenApiService` tuple, nested
//! under Swagger UI and a raw spec endpoint, wrapped in a rate limiter.
//!
//! Scoped to the core read surface the spec names explicitly — `/last`,
//! `/history`, `/schema`, `/convert`, and the analytics family. The
//! original's much larger auth/config/admin/resource-CRUD/websocket-
//! subscribe surface (`src/server/routes.py`'s `Route` enum) is out of
//! scope for this crate.

pub mod analytics;
pub mod bootstrap;
pub mod error;
pub mod query;
pub mod rate_limit;
pub mod state;

use poem::{Endpoint, EndpointExt, Route};
use poem_openapi::{OpenApiService, Tags};
use tracing::info;

use bootstrap::ApiServices;
use rate_limit::RateLimit;

#[derive(Tags)]
pub enum ApiTags {
    Query,
    Analytics,
}

type Apis = (query::QueryApi, analytics::AnalyticsApi);

pub fn make_open_api_service(services: &ApiServices) -> OpenApiService<Apis, ()> {
    OpenApiService::new(
        (
            query::QueryApi::new(services.state.clone()),
            analytics::AnalyticsApi::new(services.state.clone()),
        ),
        "Chomp Query API",
        "1.0",
    )
}

pub fn combined_routes(services: &ApiServices) -> impl Endpoint {
    let api_service = make_open_api_service(services);
    let ui = api_service.swagger_ui();
    let spec = api_service.spec_endpoint_yaml();

    Route::new()
        .nest("/", api_service)
        .nest("/docs", ui)
        .nest("/specs", spec)
        .with(RateLimit::per_minute(services.rate_limit_per_minute))
}

/// Boots the query API process: loads config, connects dependencies, binds
/// and serves (spec.md §6 `-s/--server` mode).
pub async fn run_server(config: chomp_common::config::ServerConfig) -> anyhow::Result<()> {
    let services = ApiServices::new(&config).await?;
    let bind = services.bind.clone();
    let routes = combined_routes(&services);
    info!(bind = %bind, "starting query API server");
    poem::Server::new(poem::listener::TcpListener::bind(&bind)).run(routes).await?;
    Ok(())
}
