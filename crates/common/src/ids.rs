//! Platform identifier newtypes.
//!
//! Telegram chat, message, and user identifiers are all signed 64-bit
//! integers on the wire. The newtypes keep a channel id from being passed
//! where a post id is expected.

use serde::{Deserialize, Serialize};

/// Identifier of a managed channel (a Telegram chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub i64);

/// Identifier of a single channel post (a Telegram message id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

/// Identifier of a trusted operator (a Telegram user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub i64);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }
    };
}

impl_id!(ChannelId);
impl_id!(PostId);
impl_id!(OperatorId);

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_roundtrip() {
        let id = ChannelId(-1001234567890);
        let parsed: ChannelId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn serde_transparent() {
        let json = serde_json::to_string(&PostId(42)).unwrap();
        assert_eq!(json, "42");
        let back: PostId = serde_json::from_str("42").unwrap();
        assert_eq!(back, PostId(42));
    }

    #[test]
    fn parse_rejects_non_numeric() {
        assert!("@channel".parse::<OperatorId>().is_err());
    }
}
