//! Chat transport seam.
//!
//! A channel delivers inbound messages as a stream and sends replies back.
//! The dialog layer never talks to a provider API directly.

pub mod telegram;

pub use telegram::TelegramChannel;

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::ChannelError;

/// Stream of inbound messages produced by a running channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// An inbound chat message.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Conversation key; all session state is scoped to this.
    pub chat_id: String,
    /// Message text. Non-text updates never reach the dialog layer.
    pub text: String,
    pub user_name: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// An outbound reply: text plus optional suggested quick replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub text: String,
    /// Rendered as a reply keyboard on Telegram; empty means plain text.
    pub quick_replies: Vec<String>,
}

impl OutgoingResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quick_replies: Vec::new(),
        }
    }
}

/// A chat transport.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logging.
    fn name(&self) -> &str;

    /// Start receiving and return the inbound message stream.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver a reply to the chat the message came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// Verify the channel can reach its provider.
    async fn health_check(&self) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_response_has_no_quick_replies() {
        let response = OutgoingResponse::text("hello");
        assert_eq!(response.text, "hello");
        assert!(response.quick_replies.is_empty());
    }
}
