use super::payload;
use crate::digibank::{
    chat::ChatClient,
    error::{ApiError, ErrorBody},
};
use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ChatReply {
    pub reply: String,
}

#[utoipa::path(
    post,
    path = "/chatbot",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply, or a busy notice when the model is unavailable", body = ChatReply),
        (status = 400, description = "Empty message", body = ErrorBody)
    ),
    tag = "chatbot"
)]
pub async fn chatbot(
    chat: Extension<Arc<ChatClient>>,
    request: Option<Json<ChatRequest>>,
) -> Result<Json<ChatReply>, ApiError> {
    let request = payload(request)?;

    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }

    Ok(Json(ChatReply {
        reply: chat.ask(message).await,
    }))
}
