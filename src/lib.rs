//! routewatch — a Telegram bot that tracks field workers' route status.
//!
//! Workers identify themselves (full name plus a supervisor from an
//! enumerated roster), confirm, and then report going on route or leaving
//! it; departures carry a reason. Every route start and departure reason
//! is appended to an embedded SQLite log.

pub mod channels;
pub mod config;
pub mod db;
pub mod dialog;
pub mod dispatcher;
pub mod error;
pub mod roster;

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
