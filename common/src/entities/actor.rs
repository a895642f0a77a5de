use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const ANONYMOUS_USER: &str = "Anonymous User";

/// An authenticated user acting on a complaint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<ObjectId>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl Actor {
    pub fn new(id: ObjectId, username: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            username: Some(username.into()),
            email: None,
        }
    }

    /// Name recorded in the audit trail: username, then email.
    pub fn display_name(&self) -> String {
        self.username
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or(ANONYMOUS_USER)
            .to_string()
    }
}
