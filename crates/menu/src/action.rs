/// A menu button press.
///
/// Each action has a stable short code carried in Telegram callback data, so
/// the codes are part of the wire format and must not be renamed casually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    OpenSettings,
    OpenChannelSettings,
    Back,
    Toggle,
    Edit,
    ConfirmPending,
    Cancel,
    Exit,
}

impl ButtonAction {
    /// Wire code used in callback data.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::OpenSettings => "settings",
            Self::OpenChannelSettings => "channel",
            Self::Back => "back",
            Self::Toggle => "toggle",
            Self::Edit => "edit",
            Self::ConfirmPending => "confirm",
            Self::Cancel => "cancel",
            Self::Exit => "exit",
        }
    }

    /// Parse a wire code back into an action.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "settings" => Self::OpenSettings,
            "channel" => Self::OpenChannelSettings,
            "back" => Self::Back,
            "toggle" => Self::Toggle,
            "edit" => Self::Edit,
            "confirm" => Self::ConfirmPending,
            "cancel" => Self::Cancel,
            "exit" => Self::Exit,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ButtonAction; 8] = [
        ButtonAction::OpenSettings,
        ButtonAction::OpenChannelSettings,
        ButtonAction::Back,
        ButtonAction::Toggle,
        ButtonAction::Edit,
        ButtonAction::ConfirmPending,
        ButtonAction::Cancel,
        ButtonAction::Exit,
    ];

    #[test]
    fn codes_roundtrip() {
        for action in ALL {
            assert_eq!(ButtonAction::from_code(action.code()), Some(action));
        }
    }

    #[test]
    fn codes_are_unique() {
        for a in ALL {
            for b in ALL {
                if a != b {
                    assert_ne!(a.code(), b.code());
                }
            }
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(ButtonAction::from_code("reboot"), None);
        assert_eq!(ButtonAction::from_code(""), None);
    }
}
