//! The three-mode state machine a form session runs in.

use serde::{Deserialize, Serialize};

/// The mode a form entry session is operating in.
///
/// The mode is fixed for the lifetime of a session and drives how every tag
/// renders: `Enter` produces blank input controls, `Edit` produces input
/// controls pre-populated from existing clinical data, and `View` produces
/// read-only value spans with no input controls at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Enter,
    Edit,
    View,
}

impl Mode {
    /// Whether this mode renders interactive input controls.
    pub fn is_interactive(self) -> bool {
        !matches!(self, Mode::View)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Enter => "ENTER",
            Mode::Edit => "EDIT",
            Mode::View => "VIEW",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENTER" => Ok(Mode::Enter),
            "EDIT" => Ok(Mode::Edit),
            "VIEW" => Ok(Mode::View),
            other => Err(format!("unrecognised mode '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parses_case_insensitively() {
        assert_eq!("enter".parse::<Mode>().unwrap(), Mode::Enter);
        assert_eq!("VIEW".parse::<Mode>().unwrap(), Mode::View);
        assert_eq!("Edit".parse::<Mode>().unwrap(), Mode::Edit);
    }

    #[test]
    fn test_mode_rejects_unknown_value() {
        assert!("PREVIEW".parse::<Mode>().is_err());
    }

    #[test]
    fn test_view_is_not_interactive() {
        assert!(Mode::Enter.is_interactive());
        assert!(Mode::Edit.is_interactive());
        assert!(!Mode::View.is_interactive());
    }
}
