use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Template type of a notification.
///
/// Every variant has a registered template and default subject in the
/// worker's renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ConfirmSignup,
    InviteUser,
    MagicLink,
    ChangeEmail,
    ResetPassword,
    Reauthentication,
    PasswordChanged,
    EmailChanged,
    PhoneChanged,
    IdentityLinked,
    IdentityUnlinked,
}

impl NotificationKind {
    pub const ALL: &'static [NotificationKind] = &[
        Self::ConfirmSignup,
        Self::InviteUser,
        Self::MagicLink,
        Self::ChangeEmail,
        Self::ResetPassword,
        Self::Reauthentication,
        Self::PasswordChanged,
        Self::EmailChanged,
        Self::PhoneChanged,
        Self::IdentityLinked,
        Self::IdentityUnlinked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfirmSignup => "confirm_signup",
            Self::InviteUser => "invite_user",
            Self::MagicLink => "magic_link",
            Self::ChangeEmail => "change_email",
            Self::ResetPassword => "reset_password",
            Self::Reauthentication => "reauthentication",
            Self::PasswordChanged => "password_changed",
            Self::EmailChanged => "email_changed",
            Self::PhoneChanged => "phone_changed",
            Self::IdentityLinked => "identity_linked",
            Self::IdentityUnlinked => "identity_unlinked",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unrecognized notification type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindError {
    invalid: String,
}

impl ParseKindError {
    pub fn invalid(&self) -> &str {
        &self.invalid
    }
}

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported notification type: {}", self.invalid)
    }
}

impl std::error::Error for ParseKindError {}

impl FromStr for NotificationKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| ParseKindError {
                invalid: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_roundtrip() {
        for kind in NotificationKind::ALL {
            let json = serde_json::to_string(kind).unwrap();
            let parsed: NotificationKind = serde_json::from_str(&json).unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_wire_form_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&NotificationKind::ConfirmSignup).unwrap(),
            "\"confirm_signup\""
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "magic_link".parse::<NotificationKind>().unwrap(),
            NotificationKind::MagicLink
        );
        let err = "newsletter".parse::<NotificationKind>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported notification type: newsletter");
    }
}
