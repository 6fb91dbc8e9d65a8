pub mod client_ip;
pub mod database;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tracing::error;

use board_db::Database;

use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

/// All `/api` routes. CORS and tracing are layered on by the caller.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/database/create", post(database::create_database))
        .route("/database/connect", post(database::connect_database))
        .route("/database/status", get(database::database_status))
        .route("/users", post(users::create_user).get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/addContent", post(messages::add_content))
        .route("/getAllContent", get(messages::get_all_content))
        .route("/removeContent/{msg_id}", delete(messages::remove_content))
        .with_state(state);

    Router::new().nest("/api", api)
}

/// Run blocking SQLite work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.to_string())
    })?
}
