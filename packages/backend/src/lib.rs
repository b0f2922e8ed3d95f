pub mod config;
pub mod db;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::DatabaseProxy;
use crate::state::AppState;

/// Full HTTP application over an already connected store.
pub fn build_router(db_proxy: Arc<DatabaseProxy>, config: Config) -> axum::Router {
    let state = AppState::new(db_proxy, config);

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
