//! Inbound command parsing.
//!
//! The legacy bot matched raw strings inside its transition logic; here
//! every inbound text is first normalized into a tagged [`Command`] so the
//! controller only ever matches on variants.

/// A parsed inbound command. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` — begin identity capture.
    Start,
    /// Role selection: merchandiser.
    RoleMerchandiser,
    /// Role selection: supervisor (flow unsupported).
    RoleSupervisor,
    /// `start route`
    StartRoute,
    /// `leave route`
    LeaveRoute,
    /// `reason:<text>` — payload is the remainder after the literal prefix,
    /// verbatim.
    Reason(String),
    /// Anything else (identity fields, rework decision answers), trimmed.
    Text(String),
}

const REASON_PREFIX: &str = "reason:";

impl Command {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.to_lowercase().as_str() {
            "/start" => return Self::Start,
            "merchandiser" => return Self::RoleMerchandiser,
            "supervisor" => return Self::RoleSupervisor,
            "start route" => return Self::StartRoute,
            "leave route" => return Self::LeaveRoute,
            _ => {}
        }

        // Delimiter-based prefix stripping; input shorter than the prefix is
        // plain text, never a truncated reason.
        if let Some(prefix) = trimmed.get(..REASON_PREFIX.len()) {
            if prefix.eq_ignore_ascii_case(REASON_PREFIX) {
                return Self::Reason(trimmed[REASON_PREFIX.len()..].to_string());
            }
        }

        Self::Text(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_commands_case_insensitively() {
        assert_eq!(Command::parse("/start"), Command::Start);
        assert_eq!(Command::parse("/START"), Command::Start);
        assert_eq!(Command::parse("Merchandiser"), Command::RoleMerchandiser);
        assert_eq!(Command::parse("SUPERVISOR"), Command::RoleSupervisor);
        assert_eq!(Command::parse("Start Route"), Command::StartRoute);
        assert_eq!(Command::parse("  leave route "), Command::LeaveRoute);
    }

    #[test]
    fn parses_reason_with_verbatim_payload() {
        assert_eq!(
            Command::parse("reason:flat tire"),
            Command::Reason("flat tire".to_string())
        );
        // Prefix match is case-insensitive, payload is untouched.
        assert_eq!(
            Command::parse("Reason: Flat Tire"),
            Command::Reason(" Flat Tire".to_string())
        );
        assert_eq!(Command::parse("reason:"), Command::Reason(String::new()));
    }

    #[test]
    fn short_input_is_text_not_a_truncated_reason() {
        assert_eq!(Command::parse("reas"), Command::Text("reas".to_string()));
        assert_eq!(Command::parse("reason"), Command::Text("reason".to_string()));
    }

    #[test]
    fn free_text_is_trimmed() {
        assert_eq!(
            Command::parse("  Ivanov I.I. "),
            Command::Text("Ivanov I.I.".to_string())
        );
        assert_eq!(Command::parse("   "), Command::Text(String::new()));
    }

    #[test]
    fn multibyte_input_does_not_panic_on_prefix_check() {
        assert_eq!(Command::parse("да"), Command::Text("да".to_string()));
        assert_eq!(
            Command::parse("причина: дождь"),
            Command::Text("причина: дождь".to_string())
        );
    }
}
