use axum::extract::{Extension, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use chrono::Utc;

use crate::middleware::auth::AuthUser;
use crate::response::{ok, AppError};
use crate::services::stats;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let data = stats::get_dashboard(state.pool(), state.engine(), &user.id, Utc::now()).await?;
    Ok(ok(data))
}
