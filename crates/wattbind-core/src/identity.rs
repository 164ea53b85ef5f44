//! Chat identity: the two kinds of principals a room can be bound to.

use serde::{Deserialize, Serialize};

/// A chat principal -- a private user or a group. Exactly one id is
/// carried; every dispatch and binding decision branches on the variant
/// rather than on an ambient event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatIdentity {
    User(String),
    Group(String),
}

impl ChatIdentity {
    /// Stable key for rate-limit windows and log lines.
    pub fn key(&self) -> String {
        match self {
            ChatIdentity::User(id) => format!("user:{id}"),
            ChatIdentity::Group(id) => format!("group:{id}"),
        }
    }

    /// The raw id without the kind prefix.
    pub fn raw_id(&self) -> &str {
        match self {
            ChatIdentity::User(id) | ChatIdentity::Group(id) => id,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ChatIdentity::Group(_))
    }
}

impl std::fmt::Display for ChatIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatIdentity::User(id) => write!(f, "user {id}"),
            ChatIdentity::Group(id) => write!(f, "group {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_distinct_per_kind() {
        let user = ChatIdentity::User("42".into());
        let group = ChatIdentity::Group("42".into());
        assert_ne!(user.key(), group.key());
        assert_eq!(user.raw_id(), group.raw_id());
    }
}
