//! HTTP pull transport
//!
//! Route-per-operation JSON handlers mirroring the browser client's fetch
//! calls. Reads of unknown rooms answer with empty collections so a poller
//! whose room was reaped degrades quietly; writes to them answer 404 so the
//! client knows to re-join.
//!
//! Required-field checks happen here with `Option` fields rather than in
//! the serde layer, so a missing field produces the `{"error"}` body the
//! client parses instead of a deserializer message.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use signalhub_room_core::{
    ChatMessage, ParticipantId, RoomId, SignalKind, SignalMessage, SignalPayload,
};

use crate::error::{Result, ServerError};
use crate::state::AppState;

fn required(value: Option<String>, what: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ServerError::bad_request(format!("{} is required", what))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipBody {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub success: bool,
    pub users: Vec<ParticipantId>,
}

/// POST /api/rooms/{room_id}/join
pub async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<MembershipBody>,
) -> Result<Json<JoinResponse>> {
    let user_id = required(body.user_id, "userId")?;
    let room_id = RoomId::from(room_id);
    let participant_id = ParticipantId::from(user_id);

    state.directory.join(&room_id, &participant_id).await?;
    Ok(Json(JoinResponse {
        success: true,
        users: state.directory.list_participants(&room_id),
    }))
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

/// POST /api/rooms/{room_id}/leave
pub async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<MembershipBody>,
) -> Result<Json<AckResponse>> {
    let user_id = required(body.user_id, "userId")?;
    state
        .directory
        .leave(&RoomId::from(room_id), &ParticipantId::from(user_id))
        .await?;
    Ok(Json(AckResponse { success: true }))
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<ParticipantId>,
}

/// GET /api/rooms/{room_id}/users
pub async fn list_users(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Json<UsersResponse> {
    Json(UsersResponse {
        users: state.directory.list_participants(&RoomId::from(room_id)),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatQuery {
    pub since: Option<i64>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

/// GET /api/rooms/{room_id}/messages?since=&userId=
pub async fn list_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<ChatQuery>,
) -> Json<MessagesResponse> {
    let room_id = RoomId::from(room_id);
    // An identified poller counts as alive.
    if let Some(user_id) = query.user_id.filter(|u| !u.is_empty()) {
        state.directory.touch(&room_id, &ParticipantId::from(user_id));
    }
    Json(MessagesResponse {
        messages: state.directory.list_chat(&room_id, query.since),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostChatBody {
    pub user_id: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatPostedResponse {
    pub success: bool,
    pub message: ChatMessage,
}

/// POST /api/rooms/{room_id}/messages
pub async fn post_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<PostChatBody>,
) -> Result<Json<ChatPostedResponse>> {
    let user_id = body.user_id.filter(|u| !u.is_empty());
    let text = body.text.filter(|t| !t.is_empty());
    let (user_id, text) = match (user_id, text) {
        (Some(user_id), Some(text)) => (user_id, text),
        _ => return Err(ServerError::bad_request("userId and text are required")),
    };

    let message = state
        .directory
        .post_chat(&RoomId::from(room_id), &ParticipantId::from(user_id), &text)
        .await?;
    Ok(Json(ChatPostedResponse {
        success: true,
        message,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalingQuery {
    pub user_id: Option<String>,
    pub since: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SignalsResponse {
    pub messages: Vec<SignalMessage>,
}

/// GET /api/rooms/{room_id}/signaling?userId=&since=
pub async fn list_signaling(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<SignalingQuery>,
) -> Result<Json<SignalsResponse>> {
    let user_id = required(query.user_id, "userId")?;
    let messages = state.directory.list_signals(
        &RoomId::from(room_id),
        &ParticipantId::from(user_id),
        query.since,
    );
    Ok(Json(SignalsResponse { messages }))
}

#[derive(Debug, Deserialize)]
pub struct PostSignalBody {
    pub from: Option<String>,
    pub to: Option<String>,
    pub kind: Option<SignalKind>,
    pub payload: Option<SignalPayload>,
}

#[derive(Debug, Serialize)]
pub struct SignalPostedResponse {
    pub success: bool,
    pub message: SignalMessage,
}

/// POST /api/rooms/{room_id}/signaling
pub async fn post_signaling(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<PostSignalBody>,
) -> Result<Json<SignalPostedResponse>> {
    let from = body.from.filter(|f| !f.is_empty());
    let to = body.to.filter(|t| !t.is_empty());
    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (from, to),
        _ => return Err(ServerError::bad_request("from and to are required")),
    };
    let kind = body
        .kind
        .ok_or_else(|| ServerError::bad_request("kind is required"))?;
    let payload = body
        .payload
        .ok_or_else(|| ServerError::bad_request("payload is required"))?;

    let message = state
        .directory
        .post_signal(
            &RoomId::from(room_id),
            &ParticipantId::from(from),
            &ParticipantId::from(to),
            kind,
            payload,
        )
        .await?;
    Ok(Json(SignalPostedResponse {
        success: true,
        message,
    }))
}
