//! The conversation state machine.
//!
//! One call per inbound message: inspect the session, validate the input,
//! persist if the transition calls for it, mutate the session, and hand
//! back the reply. Store writes happen before any state mutation so a
//! failed write never advances the conversation.

use std::sync::Arc;

use chrono::Local;

use crate::channels::OutgoingResponse;
use crate::db::ReasonStore;
use crate::dialog::command::Command;
use crate::dialog::replies;
use crate::dialog::session::{SessionState, Stage};
use crate::error::DatabaseError;
use crate::roster::SupervisorRoster;

pub struct ConversationController {
    store: Arc<dyn ReasonStore>,
    roster: SupervisorRoster,
}

impl ConversationController {
    pub fn new(store: Arc<dyn ReasonStore>, roster: SupervisorRoster) -> Self {
        Self { store, roster }
    }

    /// Process one inbound text against the session and produce the reply.
    ///
    /// Validation failures (unknown supervisor, unrecognized command) are
    /// not errors; they come back as corrective prompts with the session
    /// untouched. Only persistence failures surface as `Err`.
    pub async fn handle(
        &self,
        session: &mut SessionState,
        text: &str,
    ) -> Result<OutgoingResponse, DatabaseError> {
        let command = Command::parse(text);
        tracing::debug!(stage = ?session.stage, command = ?command, "dialog step");

        match session.stage {
            Stage::Idle | Stage::AwaitingRole | Stage::AwaitingFullName
            | Stage::AwaitingSupervisor => Ok(self.handle_capture(session, command, text.trim())),
            Stage::Confirmed => self.handle_confirmed(session, command).await,
            Stage::AwaitingReason => self.handle_reason(session, command).await,
            Stage::AwaitingReworkDecision => {
                // The answer is acknowledged but not branched on; yes and no
                // are treated identically, as the legacy bot did.
                session.stage = Stage::Confirmed;
                session.on_route = true;
                Ok(replies::decision_acknowledged(text.trim()))
            }
        }
    }

    /// Identity capture: everything before confirmation.
    fn handle_capture(
        &self,
        session: &mut SessionState,
        command: Command,
        raw: &str,
    ) -> OutgoingResponse {
        match command {
            Command::Start => {
                session.stage = Stage::AwaitingRole;
                replies::role_menu()
            }
            Command::RoleMerchandiser => {
                session.stage = Stage::AwaitingFullName;
                replies::prompt_full_name()
            }
            Command::RoleSupervisor => replies::supervisor_flow_unsupported(),
            Command::StartRoute | Command::LeaveRoute => replies::identity_incomplete(),
            // Free text (a reason-prefixed string is just text here): feed
            // the field-capture stage the raw trimmed input.
            Command::Reason(_) | Command::Text(_) => self.capture_field(session, raw),
        }
    }

    fn capture_field(&self, session: &mut SessionState, raw: &str) -> OutgoingResponse {
        match session.stage {
            Stage::Idle => replies::idle_hint(),
            Stage::AwaitingRole => replies::role_menu(),
            Stage::AwaitingFullName => {
                if raw.is_empty() {
                    return replies::prompt_full_name();
                }
                session.full_name = Some(raw.to_string());
                session.stage = Stage::AwaitingSupervisor;
                replies::prompt_supervisor(&self.roster)
            }
            Stage::AwaitingSupervisor => match self.roster.resolve(raw) {
                Some(canonical) => {
                    session.supervisor = Some(canonical.to_string());
                    session.stage = Stage::Confirmed;
                    replies::details_confirmed()
                }
                None => replies::supervisor_reprompt(&self.roster),
            },
            // Unreachable by construction; capture_field is only called for
            // the four stages above.
            _ => replies::choose_action(),
        }
    }

    async fn handle_confirmed(
        &self,
        session: &mut SessionState,
        command: Command,
    ) -> Result<OutgoingResponse, DatabaseError> {
        match command {
            Command::StartRoute if !session.on_route => {
                let (Some(full_name), Some(supervisor)) =
                    (session.full_name.clone(), session.supervisor.clone())
                else {
                    return Ok(replies::identity_incomplete());
                };

                self.store
                    .record_route_start(&full_name, &supervisor, Local::now().naive_local())
                    .await?;
                tracing::info!(%full_name, %supervisor, "route start recorded");

                // One identity capture per route-start cycle.
                session.reset();
                Ok(replies::route_started())
            }
            Command::LeaveRoute => {
                session.stage = Stage::AwaitingReason;
                Ok(replies::prompt_reason())
            }
            _ => Ok(replies::choose_action()),
        }
    }

    async fn handle_reason(
        &self,
        session: &mut SessionState,
        command: Command,
    ) -> Result<OutgoingResponse, DatabaseError> {
        let Command::Reason(reason) = command else {
            return Ok(replies::reason_reprompt());
        };

        let (Some(full_name), Some(supervisor)) =
            (session.full_name.clone(), session.supervisor.clone())
        else {
            return Ok(replies::identity_incomplete());
        };

        self.store
            .record_reason(&full_name, &supervisor, &reason, Local::now().naive_local())
            .await?;
        tracing::info!(%full_name, %supervisor, "route departure reason recorded");

        session.on_route = false;
        session.stage = Stage::AwaitingReworkDecision;
        Ok(replies::rework_decision())
    }
}
