//! Conversation logic: command parsing, per-chat sessions, and the
//! state machine that drives identity capture and route transitions.

pub mod command;
pub mod controller;
pub mod replies;
pub mod session;

pub use command::Command;
pub use controller::ConversationController;
pub use session::{SessionMap, SessionState, Stage};
