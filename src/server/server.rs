use anyhow::{Context, Result};
use std::time::Duration;

use tower_http::services::ServeDir;
use tracing::info;

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::library_routes::make_library_routes;
use super::{log_requests, state::*, ServerConfig};
use crate::library_store::UserId;
use crate::server::session::Session;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
    pub user_id: Option<UserId>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
        user_id: session.map(|s| s.user_id),
    };
    Json(stats)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn make_app(
    config: ServerConfig,
    library_store: GuardedLibraryStore,
    user_store: GuardedUserStore,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), library_store, user_store);

    let library_routes = make_library_routes(state.clone());

    let home_router: Router = match &config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new()
                .route("/health", get(health))
                .fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .route("/health", get(health))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/v1", library_routes)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    library_store: GuardedLibraryStore,
    user_store: GuardedUserStore,
) -> Result<()> {
    let address = format!("{}:{}", config.bind_address, config.port);
    let app = make_app(config, library_store, user_store)?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on {}", address);

    Ok(axum::serve(listener, app).await?)
}
