use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Users - Authenticated identity passed into every order operation
// ============================================================================
//
// Accounts, passwords and email verification live outside this crate. The
// ordering subsystem only needs the id and the role of the caller.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Client,
    Owner,
    Delivery,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Client, UserRole::Owner, UserRole::Delivery];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Client => "Client",
            UserRole::Owner => "Owner",
            UserRole::Delivery => "Delivery",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl User {
    pub fn new(email: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            role,
        }
    }
}
