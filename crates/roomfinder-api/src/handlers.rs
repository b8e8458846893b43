//! Route handler functions for all API endpoints.

use axum::extract::{Path, State};
use axum::Json;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use roomfinder_chat::{CallbackAction, ConversationSnapshot, Inbound, Outbound};
use roomfinder_core::types::UserId;
use roomfinder_history::HistoryEntry;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// Body of `POST /conversations/{user_id}/events`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventRequest {
    Text { text: String },
    /// Raw audio, base64 encoded.
    Voice { audio_base64: String },
    Callback { action: CallbackAction },
}

impl EventRequest {
    fn into_inbound(self) -> Result<Inbound, ApiError> {
        match self {
            EventRequest::Text { text } => Ok(Inbound::Text(text)),
            EventRequest::Voice { audio_base64 } => BASE64
                .decode(audio_base64.trim())
                .map(Inbound::Voice)
                .map_err(|e| ApiError::BadRequest(format!("invalid base64 audio: {}", e))),
            EventRequest::Callback { action } => Ok(Inbound::Callback(action)),
        }
    }
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub conversations: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventResponse {
    pub replies: Vec<Outbound>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub user_id: UserId,
    #[serde(flatten)]
    pub snapshot: ConversationSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub user_id: UserId,
    pub entries: Vec<HistoryEntry>,
}

fn user_id(raw: i64) -> Result<UserId, ApiError> {
    if raw <= 0 {
        return Err(ApiError::BadRequest(format!(
            "user id must be positive, got {}",
            raw
        )));
    }
    Ok(UserId(raw))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        conversations: state.orchestrator.conversation_count(),
    })
}

/// POST /conversations/{user_id}/events - deliver one chat event.
pub async fn post_event(
    State(state): State<AppState>,
    Path(raw_user): Path<i64>,
    Json(request): Json<EventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    let user = user_id(raw_user)?;
    let inbound = request.into_inbound()?;
    let replies = state.orchestrator.handle_event(user, inbound).await?;
    Ok(Json(EventResponse { replies }))
}

/// GET /conversations/{user_id} - current step and query state.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(raw_user): Path<i64>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let user = user_id(raw_user)?;
    let snapshot = state
        .orchestrator
        .snapshot(user)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("no conversation for user {}", user)))?;
    Ok(Json(ConversationResponse {
        user_id: user,
        snapshot,
    }))
}

/// GET /conversations/{user_id}/history - the user's logged searches.
pub async fn get_history(
    State(state): State<AppState>,
    Path(raw_user): Path<i64>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let user = user_id(raw_user)?;
    let entries = state.orchestrator.history_entries(user).await?;
    Ok(Json(HistoryResponse {
        user_id: user,
        entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_request_wire_format() {
        let request: EventRequest =
            serde_json::from_value(json!({"type": "text", "text": "/lowprice"})).unwrap();
        assert!(matches!(request, EventRequest::Text { ref text } if text == "/lowprice"));

        let request: EventRequest = serde_json::from_value(json!({
            "type": "callback",
            "action": {"type": "photos", "wanted": true}
        }))
        .unwrap();
        assert!(matches!(
            request.into_inbound().unwrap(),
            Inbound::Callback(CallbackAction::Photos { wanted: true })
        ));
    }

    #[test]
    fn test_voice_decoding() {
        let request = EventRequest::Voice {
            audio_base64: BASE64.encode([1u8, 2, 3]),
        };
        assert_eq!(request.into_inbound().unwrap(), Inbound::Voice(vec![1, 2, 3]));

        let request = EventRequest::Voice {
            audio_base64: "not base64!".to_string(),
        };
        assert!(matches!(request.into_inbound(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_user_id_must_be_positive() {
        assert_eq!(user_id(42).unwrap(), UserId(42));
        assert!(user_id(0).is_err());
        assert!(user_id(-3).is_err());
    }
}
