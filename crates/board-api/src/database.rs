use axum::{Json, extract::State};
use tracing::info;

use board_types::api::{ApiResponse, DatabaseConfig, DatabaseStatus};

use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::{AppState, blocking};

/// POST /api/database/create
pub async fn create_database(
    State(state): State<AppState>,
    JsonBody(config): JsonBody<DatabaseConfig>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let name = config.dbname.clone();

    blocking(move || {
        state
            .db
            .create_database(&config)
            .map_err(ApiError::from)
    })
    .await?;

    Ok(Json(ApiResponse::done(format!("database {} created", name))))
}

/// POST /api/database/connect
///
/// Open, migrate and swap in the new pool.
pub async fn connect_database(
    State(state): State<AppState>,
    JsonBody(config): JsonBody<DatabaseConfig>,
) -> ApiResult<Json<ApiResponse<()>>> {

    blocking(move || state.db.connect(&config).map_err(ApiError::from)).await?;

    info!("Database connected via admin API");
    Ok(Json(ApiResponse::done("database connected")))
}

/// GET /api/database/status
///
/// Never fails when disconnected.
pub async fn database_status(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<DatabaseStatus>>> {
    let status = blocking(move || Ok(state.db.status())).await?;
    Ok(Json(ApiResponse::ok("database status", status)))
}
