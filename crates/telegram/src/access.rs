use firstmate_common::OperatorId;

use crate::config::TelegramBotConfig;

/// Reason an inbound update was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    /// The sender is not on the operator allowlist.
    NotAnOperator,
    /// No operators are configured at all; nobody may use the menu.
    NoOperatorsConfigured,
}

impl std::fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnOperator => write!(f, "user is not an operator"),
            Self::NoOperatorsConfigured => write!(f, "no operators configured"),
        }
    }
}

/// Determine if `user` may drive the settings menu.
///
/// An empty operator list denies everyone: removing the last operator must
/// not silently switch the bot to open access.
pub fn check_operator(config: &TelegramBotConfig, user: OperatorId) -> Result<(), AccessDenied> {
    if config.operators.is_empty() {
        return Err(AccessDenied::NoOperatorsConfigured);
    }
    if config.operators.contains(&user) {
        Ok(())
    } else {
        Err(AccessDenied::NotAnOperator)
    }
}
