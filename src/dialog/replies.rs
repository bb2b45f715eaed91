//! Outbound reply construction.

use crate::channels::OutgoingResponse;
use crate::roster::SupervisorRoster;

pub fn role_menu() -> OutgoingResponse {
    OutgoingResponse {
        text: "Please choose your role:".to_string(),
        quick_replies: vec!["merchandiser".to_string(), "supervisor".to_string()],
    }
}

pub fn supervisor_flow_unsupported() -> OutgoingResponse {
    OutgoingResponse::text(
        "You chose supervisor. That flow is not supported yet; please choose merchandiser.",
    )
}

pub fn prompt_full_name() -> OutgoingResponse {
    OutgoingResponse::text("Please enter your full name:")
}

pub fn prompt_supervisor(roster: &SupervisorRoster) -> OutgoingResponse {
    OutgoingResponse::text(format!(
        "Please enter your supervisor's name ({}):",
        roster.display_options()
    ))
}

pub fn supervisor_reprompt(roster: &SupervisorRoster) -> OutgoingResponse {
    OutgoingResponse::text(format!(
        "Please choose a valid supervisor: {}.",
        roster.display_options()
    ))
}

pub fn details_confirmed() -> OutgoingResponse {
    OutgoingResponse::text("Your details are confirmed. You can start work.")
}

pub fn route_started() -> OutgoingResponse {
    OutgoingResponse::text("You are on route. Good luck!")
}

pub fn prompt_reason() -> OutgoingResponse {
    OutgoingResponse::text("You left your route. Please describe the reason as reason:<text>")
}

pub fn reason_reprompt() -> OutgoingResponse {
    OutgoingResponse::text("Please describe the reason as reason:<text>")
}

pub fn rework_decision() -> OutgoingResponse {
    OutgoingResponse {
        text: "Reason saved. Are you going to rework the route? Please answer 'yes' or 'no'."
            .to_string(),
        quick_replies: vec!["yes".to_string(), "no".to_string()],
    }
}

pub fn decision_acknowledged(answer: &str) -> OutgoingResponse {
    OutgoingResponse::text(format!("You answered: {answer}"))
}

pub fn identity_incomplete() -> OutgoingResponse {
    OutgoingResponse::text("Please enter your details before starting a route. Send /start to begin.")
}

pub fn choose_action() -> OutgoingResponse {
    OutgoingResponse::text("Please choose an action: 'start route' or 'leave route'.")
}

pub fn idle_hint() -> OutgoingResponse {
    OutgoingResponse::text("Send /start to begin.")
}
