//! Chat handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};

use sparkup_core::error::AppError;
use sparkup_core::types::{PostId, UserId};
use sparkup_service::chat::MessagePage;

use crate::dto::request::MessageHistoryRequest;
use crate::dto::response::{MemberListResponse, RoomListResponse};
use crate::extractors::PaginationParams;
use crate::state::AppState;

/// POST /api/chat/rooms/{user_id}
pub async fn list_rooms(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    body: Bytes,
) -> Result<Json<RoomListResponse>, AppError> {
    let params = PaginationParams::from_body(&body)?;
    let page = state
        .room_service
        .list_rooms(user_id, params.into_page_request())
        .await?;
    Ok(Json(page.into()))
}

/// POST /api/chat/messages
pub async fn message_history(
    State(state): State<AppState>,
    Json(req): Json<MessageHistoryRequest>,
) -> Result<Json<MessagePage>, AppError> {
    let page = state.history_service.history(req.into_query()?).await?;
    Ok(Json(page))
}

/// GET /api/chat/rooms/{post_id}/members
pub async fn list_members(
    State(state): State<AppState>,
    Path(post_id): Path<PostId>,
) -> Result<Json<MemberListResponse>, AppError> {
    let members = state.member_service.list_members(post_id).await?;
    Ok(Json(MemberListResponse { members }))
}
