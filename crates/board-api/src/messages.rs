use axum::{
    Json,
    extract::{
        Path, State,
        rejection::PathRejection,
    },
};
use tracing::info;

use board_db::models::NewContent;
use board_types::api::{ApiResponse, CreateContentRequest};
use board_types::models::MessageContent;

use crate::client_ip::ClientIp;
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;
use crate::{AppState, blocking};

/// POST /api/addContent
///
/// The poster's address comes from the request,
/// not the body.
pub async fn add_content(
    State(state): State<AppState>,
    ClientIp(user_ip): ClientIp,
    JsonBody(req): JsonBody<CreateContentRequest>,
) -> ApiResult<Json<ApiResponse<MessageContent>>> {
    let contents = state.db.contents()?;

    let new = NewContent {
        user_id: req.user_id,
        user_ip,
        content: req.content,
    };
    let posted = blocking(move || contents.create(&new).map_err(ApiError::store("failed to post message")))
        .await?;

    info!("Message {} posted from {}", posted.msg_id, posted.user_ip);
    Ok(Json(ApiResponse::ok("message posted", posted)))
}

/// GET /api/getAllContent
pub async fn get_all_content(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<MessageContent>>>> {
    let contents = state.db.contents()?;

    let rows = blocking(move || contents.list().map_err(ApiError::store("failed to query messages")))
        .await?;

    Ok(Json(ApiResponse::ok("query succeeded", rows)))
}

/// DELETE /api/removeContent/{msg_id}
pub async fn remove_content(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let contents = state.db.contents()?;
    let Path(msg_id) =
        path.map_err(|_| ApiError::BadRequest("invalid msg_id parameter".into()))?;

    blocking(move || contents.delete(msg_id).map_err(ApiError::store("failed to delete message")))
        .await?;

    Ok(Json(ApiResponse::done("message deleted")))
}
