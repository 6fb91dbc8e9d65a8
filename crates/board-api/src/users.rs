use axum::{
    Json,
    extract::{
        Path, State,
        rejection::PathRejection,
    },
};

use board_types::api::{ApiResponse, CreateUserRequest, UpdateUserRequest};
use board_types::models::User;

use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::{AppState, blocking};

fn user_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest("invalid id parameter".into()))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let users = state.db.users()?;

    let user = blocking(move || users.create(&req).map_err(ApiError::store("failed to create user")))
        .await?;

    Ok(Json(ApiResponse::ok("user created", user)))
}

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    let users = state.db.users()?;

    let rows = blocking(move || users.list().map_err(ApiError::store("failed to query users"))).await?;

    Ok(Json(ApiResponse::ok("query succeeded", rows)))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let users = state.db.users()?;
    let id = user_id(path)?;

    let user = blocking(move || users.get(id).map_err(ApiError::store("failed to query user"))).await?;

    Ok(Json(ApiResponse::ok("query succeeded", user)))
}

/// PUT /api/users/{id}
///
/// The user must exist before the body is looked at. Only the fields
/// present in the body are changed.
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<JsonBody<UpdateUserRequest>, ApiError>,
) -> ApiResult<Json<ApiResponse<User>>> {
    let users = state.db.users()?;
    let id = user_id(path)?;

    let user = blocking(move || {
        users.get(id).map_err(ApiError::store("failed to query user"))?;
        let JsonBody(patch) = payload?;
        users
            .update(id, &patch)
            .map_err(ApiError::store("failed to update user"))
    })
    .await?;

    Ok(Json(ApiResponse::ok("user updated", user)))
}

/// DELETE /api/users/{id}
///
/// Succeeds whether or not the user existed.
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let users = state.db.users()?;
    let id = user_id(path)?;

    blocking(move || users.delete(id).map_err(ApiError::store("failed to delete user"))).await?;

    Ok(Json(ApiResponse::done("user deleted")))
}
