use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{Role, UserId};

/// An authenticated principal as reported by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            email,
        }
    }
}

/// E-mail addresses whose accounts are created with the `staff` role.
///
/// Membership is decided outside the core; the list is treated as
/// authoritative when assigning the initial role at signup.
#[derive(Debug, Clone, Default)]
pub struct StaffAllowList {
    emails: HashSet<String>,
}

impl StaffAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let emails = emails
            .into_iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    /// Parse a comma-separated list, ignoring blanks.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&normalize(email))
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    /// Initial role for a newly registered account.
    pub fn role_for(&self, email: Option<&str>) -> Role {
        match email {
            Some(email) if self.contains(email) => Role::Staff,
            _ => Role::Student,
        }
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
