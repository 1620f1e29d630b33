use serde::{Deserialize, Serialize};

#[cfg(feature = "validation")]
use validator::Validate;

/// Most messages accepted in one chat request.
pub const MAX_CHAT_MESSAGES: usize = 50;
/// Longest message content accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct ChatRequest {
    #[cfg_attr(
        feature = "validation",
        validate(
            length(min = 1, max = 50, message = "Between 1 and 50 messages are required"),
            custom(function = "validate_turns")
        )
    )]
    pub messages: Vec<ChatMessage>,
}

/// First rule a conversation breaks: it must open with the user, strictly
/// alternate roles, and keep every message non-empty and bounded.
pub fn turn_error(messages: &[ChatMessage]) -> Option<String> {
    if let Some(first) = messages.first() {
        if first.role != ChatRole::User {
            return Some("The first message must be from the user".to_string());
        }
    }
    for (i, pair) in messages.windows(2).enumerate() {
        if pair[0].role == pair[1].role {
            return Some(format!(
                "Message roles must alternate between user and assistant (message {})",
                i + 2
            ));
        }
    }
    for (i, message) in messages.iter().enumerate() {
        if message.content.trim().is_empty() {
            return Some(format!("Message {} must not be empty", i + 1));
        }
        if message.content.chars().count() > MAX_MESSAGE_CHARS {
            return Some(format!(
                "Message {} must be at most {MAX_MESSAGE_CHARS} characters",
                i + 1
            ));
        }
    }
    None
}

#[cfg(feature = "validation")]
fn validate_turns(messages: &[ChatMessage]) -> Result<(), validator::ValidationError> {
    match turn_error(messages) {
        None => Ok(()),
        Some(message) => {
            let mut err = validator::ValidationError::new("turns");
            err.message = Some(message.into());
            Err(err)
        }
    }
}
