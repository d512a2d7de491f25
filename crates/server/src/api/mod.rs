//! HTTP surface.
//!
//! Everything is mounted under the configured base path:
//! - `POST {base}/v1/token`, `POST {base}/v1/signin` - see [`crate::oauth2::endpoints`]
//! - `GET|HEAD {base}/healthz`
//! - `{base}/api-docs` - ReDoc UI for the generated OpenAPI document

pub mod health;
pub mod openapi;

pub use health::MISC_TAG;

use crate::AppResources;
use crate::oauth2::{self, OAuth2State};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Normalize a configured base path: no trailing slash, "" for the root.
fn normalize_base_path(base_path: &str) -> String {
    base_path.trim_end_matches('/').to_string()
}

/// Builds the application router for the given grants.
pub fn app_router(state: OAuth2State, base_path: &str) -> Router {
    let base = normalize_base_path(base_path);

    let api = OpenApiRouter::new()
        .merge(oauth2::router(state))
        .routes(routes!(health::health));

    let mounted = if base.is_empty() {
        OpenApiRouter::with_openapi(openapi::ApiDoc::openapi()).merge(api)
    } else {
        OpenApiRouter::with_openapi(openapi::ApiDoc::openapi()).nest(&base, api)
    };

    let (router, api) = mounted
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url(format!("{base}/api-docs"), api))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(app_resources))]
pub async fn start_webserver(app_resources: AppResources) -> color_eyre::Result<()> {
    let state = OAuth2State::new(
        app_resources.db.clone(),
        &app_resources.config.authentication,
    )?;
    let router = app_router(state, &app_resources.config.base_path);

    let addr = app_resources.config.listen_addr.as_str();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr,
        base_path = %app_resources.config.base_path,
        "Server running"
    );
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_normalization() {
        assert_eq!(normalize_base_path("/auth"), "/auth");
        assert_eq!(normalize_base_path("/auth/"), "/auth");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path(""), "");
    }
}
