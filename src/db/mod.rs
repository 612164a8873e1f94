//! Database layer (document store).
//!
//! Everything above this module talks to a [`DocumentStore`]; the production
//! implementation is [`FirestoreDb`], tests and local runs use [`MemoryStore`].

pub mod collection;
pub mod firestore;
pub mod memory;
pub mod profiles;

pub use collection::{Collection, DecodePolicy, Fetched};
pub use firestore::FirestoreDb;
pub use memory::MemoryStore;
pub use profiles::ProfileStore;

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TASKS: &str = "tasks";
    pub const HABITS: &str = "habits";
    pub const TIMERS: &str = "timers";
    pub const SECTIONS: &str = "sections";

    /// Every per-user collection, in cascade-deletion order.
    pub const USER_SCOPED: [&str; 4] = [TASKS, HABITS, TIMERS, SECTIONS];
}

/// Flat field map of a stored document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Address of a collection: the `users` root or a collection under one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    user_id: Option<String>,
    name: &'static str,
}

impl CollectionPath {
    /// The root `users` collection holding profile documents.
    pub fn users() -> Self {
        Self {
            user_id: None,
            name: collections::USERS,
        }
    }

    /// `users/{user_id}/{name}`.
    pub fn user_scoped(user_id: impl Into<String>, name: &'static str) -> Self {
        Self {
            user_id: Some(user_id.into()),
            name,
        }
    }

    pub fn tasks(user_id: &str) -> Self {
        Self::user_scoped(user_id, collections::TASKS)
    }

    pub fn habits(user_id: &str) -> Self {
        Self::user_scoped(user_id, collections::HABITS)
    }

    pub fn timers(user_id: &str) -> Self {
        Self::user_scoped(user_id, collections::TIMERS)
    }

    pub fn sections(user_id: &str) -> Self {
        Self::user_scoped(user_id, collections::SECTIONS)
    }

    /// Owning user, `None` for the root collection.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user_id {
            Some(uid) => write!(f, "{}/{}/{}", collections::USERS, uid, self.name),
            None => f.write_str(self.name),
        }
    }
}

/// A document as returned by the backend, before typed decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub fields: Fields,
    /// Set when the backend could not read the document; `fields` is empty.
    pub unreadable: Option<String>,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
            unreadable: None,
        }
    }

    /// A document the backend returned but could not convert to fields.
    pub fn unreadable(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Fields::new(),
            unreadable: Some(message.into()),
        }
    }
}

/// Encode a free-form name (e.g. a section label) as a single document ID.
pub fn document_id_for_name(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

/// Minimal document-database contract.
///
/// Reads always return the whole collection. Writes are either a
/// whole-document replace ([`set`](Self::set)) or a field patch
/// ([`update`](Self::update)); there are no multi-document transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in a collection, ordered by document ID.
    async fn list(&self, path: &CollectionPath) -> Result<Vec<RawDocument>>;

    /// A single document, if it exists.
    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<RawDocument>>;

    /// Create or replace a document.
    async fn set(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<()>;

    /// Create or replace a document, stamping `timestamp_field` with the
    /// backend's own clock.
    async fn create_with_server_time(
        &self,
        path: &CollectionPath,
        id: &str,
        fields: Fields,
        timestamp_field: &str,
    ) -> Result<()>;

    /// Patch the given fields of an existing document. `null` values clear.
    async fn update(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path_display() {
        assert_eq!(CollectionPath::users().to_string(), "users");
        assert_eq!(CollectionPath::tasks("u1").to_string(), "users/u1/tasks");
        assert_eq!(CollectionPath::sections("u1").user_id(), Some("u1"));
    }

    #[test]
    fn test_document_id_for_name_escapes_slashes() {
        assert_eq!(document_id_for_name("Inbox"), "Inbox");
        assert_eq!(document_id_for_name("Work/Home"), "Work%2FHome");
    }
}
