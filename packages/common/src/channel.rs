use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery channel for a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    /// Reserved; no provider is wired up yet.
    Sms,
    /// Reserved; no provider is wired up yet.
    Push,
}

impl Channel {
    pub const ALL: &'static [Channel] = &[Self::Email, Self::Sms, Self::Push];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid channel string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChannelError {
    invalid: String,
}

impl fmt::Display for ParseChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid channel '{}'. Valid values: {}",
            self.invalid,
            Channel::ALL
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseChannelError {}

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "push" => Ok(Self::Push),
            _ => Err(ParseChannelError {
                invalid: s.to_string(),
            }),
        }
    }
}
