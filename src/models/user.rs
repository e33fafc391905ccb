use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Pending,
    Active,
    Rejected,
    Suspended,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
            UserStatus::Rejected => "rejected",
            UserStatus::Suspended => "suspended",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(UserStatus::Pending),
            "active" => Some(UserStatus::Active),
            "rejected" => Some(UserStatus::Rejected),
            "suspended" => Some(UserStatus::Suspended),
            _ => None,
        }
    }

    /// Transitions an admin may apply to an account.
    pub fn can_transition_to(self, next: UserStatus) -> bool {
        matches!(
            (self, next),
            (UserStatus::Pending, UserStatus::Active)
                | (UserStatus::Pending, UserStatus::Rejected)
                | (UserStatus::Active, UserStatus::Suspended)
                | (UserStatus::Suspended, UserStatus::Active)
                | (UserStatus::Rejected, UserStatus::Active)
        )
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub company_name: String,
    pub is_admin: bool,
    pub status: String,
    pub password_hash: Option<String>,
    pub invite_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Unknown status strings are treated as suspended so they never grant access.
    pub fn status(&self) -> UserStatus {
        UserStatus::parse(&self.status).unwrap_or(UserStatus::Suspended)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub company_name: String,
    pub is_admin: bool,
    pub status: UserStatus,
    pub password_hash: Option<String>,
    pub invite_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_accounts_can_be_approved_or_rejected() {
        assert!(UserStatus::Pending.can_transition_to(UserStatus::Active));
        assert!(UserStatus::Pending.can_transition_to(UserStatus::Rejected));
        assert!(!UserStatus::Pending.can_transition_to(UserStatus::Suspended));
    }

    #[test]
    fn suspension_is_reversible_but_not_to_pending() {
        assert!(UserStatus::Active.can_transition_to(UserStatus::Suspended));
        assert!(UserStatus::Suspended.can_transition_to(UserStatus::Active));
        assert!(!UserStatus::Suspended.can_transition_to(UserStatus::Pending));
        assert!(!UserStatus::Active.can_transition_to(UserStatus::Active));
    }

    #[test]
    fn status_strings_parse() {
        for status in [UserStatus::Pending, UserStatus::Active, UserStatus::Rejected, UserStatus::Suspended] {
            assert_eq!(UserStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(UserStatus::parse("deleted"), None);
    }
}
