//! Bridges the channel's message stream to the conversation controller.
//!
//! Each chat gets a dedicated worker task draining a FIFO queue, so a
//! chat's commands run to completion (persistence and reply included) in
//! arrival order, while distinct chats are processed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::channels::{Channel, IncomingMessage};
use crate::dialog::{ConversationController, SessionMap, SessionState};
use crate::error::Error;

pub struct Dispatcher {
    channel: Arc<dyn Channel>,
    controller: Arc<ConversationController>,
    sessions: Arc<SessionMap>,
}

impl Dispatcher {
    pub fn new(channel: Arc<dyn Channel>, controller: Arc<ConversationController>) -> Self {
        Self {
            channel,
            controller,
            sessions: Arc::new(SessionMap::new()),
        }
    }

    /// Consume the channel stream until it ends. Only returns early if the
    /// channel fails to start.
    pub async fn run(&self) -> Result<(), Error> {
        let mut stream = self.channel.start().await?;
        let mut workers = JoinSet::new();
        let mut queues: HashMap<String, mpsc::UnboundedSender<IncomingMessage>> = HashMap::new();

        while let Some(msg) = stream.next().await {
            let queue = queues.entry(msg.chat_id.clone()).or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                let channel = Arc::clone(&self.channel);
                let controller = Arc::clone(&self.controller);
                let session = self.sessions.get_or_create(&msg.chat_id);
                workers.spawn(drain_chat(channel, controller, session, rx));
                tx
            });
            // The worker only exits once its sender is dropped, so this
            // cannot fail while the queue entry is alive.
            let _ = queue.send(msg);
        }

        // Close every queue and let the workers finish their backlogs.
        drop(queues);
        while workers.join_next().await.is_some() {}
        Ok(())
    }
}

/// Process one chat's messages in arrival order until its queue closes.
async fn drain_chat(
    channel: Arc<dyn Channel>,
    controller: Arc<ConversationController>,
    session: Arc<tokio::sync::Mutex<SessionState>>,
    mut queue: mpsc::UnboundedReceiver<IncomingMessage>,
) {
    while let Some(msg) = queue.recv().await {
        process(channel.as_ref(), &controller, &session, msg).await;
    }
}

/// Handle one inbound message end to end.
async fn process(
    channel: &dyn Channel,
    controller: &ConversationController,
    session: &tokio::sync::Mutex<SessionState>,
    msg: IncomingMessage,
) {
    let mut state = session.lock().await;

    let reply = match controller.handle(&mut state, &msg.text).await {
        Ok(reply) => reply,
        Err(e) => {
            // The write failed and the session did not advance; the worker
            // can simply repeat the command.
            tracing::error!(chat_id = %msg.chat_id, error = %e, "persistence failed");
            return;
        }
    };

    if let Err(e) = channel.respond(&msg, reply).await {
        // State is already committed; delivery failure only costs the reply.
        tracing::warn!(chat_id = %msg.chat_id, error = %e, "reply delivery failed");
    }
}
