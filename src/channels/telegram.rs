//! Telegram Bot API transport.
//!
//! Long-polls `getUpdates` on a background task and feeds text messages
//! into the channel stream; replies go out via `sendMessage`, with quick
//! replies rendered as a resizing reply keyboard.

use chrono::Utc;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::config::TelegramConfig;
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "telegram";

/// Backoff between polls after a transport error.
const POLL_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(2);

#[derive(Clone)]
pub struct TelegramChannel {
    client: reqwest::Client,
    config: TelegramConfig,
}

/// The bot's own identity, from `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    #[serde(default)]
    from: Option<TgUser>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    first_name: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
struct ReplyKeyboardMarkup {
    keyboard: Vec<Vec<KeyboardButton>>,
    resize_keyboard: bool,
}

#[derive(Debug, Serialize)]
struct KeyboardButton {
    text: String,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base,
            self.config.token.expose_secret(),
            method
        )
    }

    /// Fetch the bot's identity. Also serves as the credential check.
    pub async fn get_me(&self) -> Result<BotIdentity, ChannelError> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        let envelope: ApiEnvelope<BotIdentity> = response
            .json()
            .await
            .map_err(|e| ChannelError::InvalidMessage(e.to_string()))?;

        match envelope {
            ApiEnvelope {
                ok: true,
                result: Some(identity),
                ..
            } => Ok(identity),
            ApiEnvelope { description, .. } => Err(ChannelError::AuthFailed {
                name: CHANNEL_NAME.to_string(),
                reason: description.unwrap_or_else(|| "getMe rejected".to_string()),
            }),
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, ChannelError> {
        let poll_secs = self.config.poll_timeout.as_secs();
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset.to_string()), ("timeout", poll_secs.to_string())])
            // The HTTP timeout must outlast the server-side long poll.
            .timeout(self.config.poll_timeout + std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        let envelope: ApiEnvelope<Vec<Update>> = response
            .json()
            .await
            .map_err(|e| ChannelError::InvalidMessage(e.to_string()))?;

        match envelope {
            ApiEnvelope {
                ok: true,
                result: Some(updates),
                ..
            } => Ok(updates),
            ApiEnvelope { description, .. } => Err(ChannelError::Http(
                description.unwrap_or_else(|| "getUpdates rejected".to_string()),
            )),
        }
    }

    async fn send_message(
        &self,
        chat_id: i64,
        response: &OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let reply_markup = if response.quick_replies.is_empty() {
            None
        } else {
            // One row of buttons, resized to fit, as the legacy bot sent.
            Some(ReplyKeyboardMarkup {
                keyboard: vec![response
                    .quick_replies
                    .iter()
                    .map(|text| KeyboardButton { text: text.clone() })
                    .collect()],
                resize_keyboard: true,
            })
        };

        let body = SendMessage {
            chat_id,
            text: &response.text,
            reply_markup,
        };

        let http_response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        let envelope: ApiEnvelope<serde_json::Value> = http_response
            .json()
            .await
            .map_err(|e| ChannelError::InvalidMessage(e.to_string()))?;

        if !envelope.ok {
            return Err(ChannelError::SendFailed {
                name: CHANNEL_NAME.to_string(),
                reason: envelope
                    .description
                    .unwrap_or_else(|| "sendMessage rejected".to_string()),
            });
        }
        Ok(())
    }
}

fn update_to_message(update: Update) -> Option<IncomingMessage> {
    let message = update.message?;
    let text = message.text?;
    Some(IncomingMessage {
        chat_id: message.chat.id.to_string(),
        text,
        user_name: message.from.map(|u| u.first_name),
        received_at: Utc::now(),
    })
}

#[async_trait::async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = mpsc::channel::<IncomingMessage>(64);
        let channel = self.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;
            loop {
                let updates = match channel.get_updates(offset).await {
                    Ok(updates) => updates,
                    Err(e) => {
                        // Keep polling through transient faults, as the
                        // legacy error handler did.
                        tracing::warn!(error = %e, "getUpdates failed, retrying");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let Some(message) = update_to_message(update) else {
                        continue;
                    };
                    if tx.send(message).await.is_err() {
                        tracing::debug!("message stream dropped, stopping poller");
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id: i64 = msg
            .chat_id
            .parse()
            .map_err(|_| ChannelError::InvalidMessage(format!("bad chat id: {}", msg.chat_id)))?;
        self.send_message(chat_id, &response).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        self.get_me().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use httpmock::prelude::*;
    use secrecy::SecretString;
    use serde_json::json;

    fn config(base: &str) -> TelegramConfig {
        TelegramConfig {
            token: SecretString::from("123:abc"),
            api_base: base.trim_end_matches('/').to_string(),
            poll_timeout: std::time::Duration::from_secs(0),
        }
    }

    #[tokio::test]
    async fn get_me_parses_identity() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bot123:abc/getMe");
            then.status(200).json_body(json!({
                "ok": true,
                "result": {"id": 42, "first_name": "routewatch", "username": "routewatch_bot"}
            }));
        });

        let channel = TelegramChannel::new(config(&server.base_url()));
        let me = channel.get_me().await.unwrap();
        assert_eq!(me.id, 42);
        assert_eq!(me.first_name, "routewatch");
        assert_eq!(me.username.as_deref(), Some("routewatch_bot"));
        assert!(channel.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn get_me_rejection_is_an_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bot123:abc/getMe");
            then.status(401)
                .json_body(json!({"ok": false, "description": "Unauthorized"}));
        });

        let channel = TelegramChannel::new(config(&server.base_url()));
        let err = channel.get_me().await.unwrap_err();
        assert!(matches!(err, ChannelError::AuthFailed { .. }), "{err}");
    }

    #[tokio::test]
    async fn start_streams_text_messages_and_skips_the_rest() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bot123:abc/getUpdates");
            then.status(200).json_body(json!({
                "ok": true,
                "result": [
                    {"update_id": 10, "message": {"chat": {"id": 7}, "from": {"first_name": "Ivan"}, "text": "/start"}},
                    // No text (e.g. a photo): skipped.
                    {"update_id": 11, "message": {"chat": {"id": 7}, "from": {"first_name": "Ivan"}}},
                    // No message (e.g. an edited_message update): skipped.
                    {"update_id": 12}
                ]
            }));
        });

        let channel = TelegramChannel::new(config(&server.base_url()));
        let mut stream = channel.start().await.unwrap();

        let msg = tokio::time::timeout(std::time::Duration::from_secs(5), stream.next())
            .await
            .expect("poller should produce a message")
            .expect("stream open");
        assert_eq!(msg.chat_id, "7");
        assert_eq!(msg.text, "/start");
        assert_eq!(msg.user_name.as_deref(), Some("Ivan"));
    }

    #[tokio::test]
    async fn respond_posts_plain_text_without_keyboard() {
        let server = MockServer::start();
        let sent = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/sendMessage")
                .json_body_partial(r#"{"chat_id": 7, "text": "Please enter your full name:"}"#);
            then.status(200)
                .json_body(json!({"ok": true, "result": {"message_id": 1}}));
        });

        let channel = TelegramChannel::new(config(&server.base_url()));
        let msg = IncomingMessage {
            chat_id: "7".to_string(),
            text: "merchandiser".to_string(),
            user_name: None,
            received_at: Utc::now(),
        };
        channel
            .respond(&msg, OutgoingResponse::text("Please enter your full name:"))
            .await
            .unwrap();
        sent.assert();
    }

    #[tokio::test]
    async fn respond_renders_quick_replies_as_reply_keyboard() {
        let server = MockServer::start();
        let sent = server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage").json_body_partial(
                r#"{
                    "chat_id": 7,
                    "reply_markup": {
                        "keyboard": [[{"text": "merchandiser"}, {"text": "supervisor"}]],
                        "resize_keyboard": true
                    }
                }"#,
            );
            then.status(200)
                .json_body(json!({"ok": true, "result": {"message_id": 2}}));
        });

        let channel = TelegramChannel::new(config(&server.base_url()));
        let msg = IncomingMessage {
            chat_id: "7".to_string(),
            text: "/start".to_string(),
            user_name: None,
            received_at: Utc::now(),
        };
        channel
            .respond(
                &msg,
                OutgoingResponse {
                    text: "Please choose your role:".to_string(),
                    quick_replies: vec!["merchandiser".to_string(), "supervisor".to_string()],
                },
            )
            .await
            .unwrap();
        sent.assert();
    }

    #[tokio::test]
    async fn send_rejection_surfaces_as_send_failed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage");
            then.status(400)
                .json_body(json!({"ok": false, "description": "Bad Request: chat not found"}));
        });

        let channel = TelegramChannel::new(config(&server.base_url()));
        let msg = IncomingMessage {
            chat_id: "7".to_string(),
            text: "hi".to_string(),
            user_name: None,
            received_at: Utc::now(),
        };
        let err = channel
            .respond(&msg, OutgoingResponse::text("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::SendFailed { .. }), "{err}");
    }
}
