//! Durable conversation storage
//!
//! Stores the full conversation collection in an embedded `sled` database
//! under a single key, serialized as one JSON array. Every save is a full
//! rewrite of the collection; reads are always consistent with the most
//! recent write since there is only one writer.
//!
//! The collection is kept in upsert-history order: the most-recently-saved
//! conversation is first. `list` does NOT re-sort by `updated_at` at read
//! time; list views depend on this order.

use crate::error::{MitraError, Result};
use crate::session::types::Conversation;
use anyhow::Context;
use directories::ProjectDirs;
use sled::Db;
use std::path::{Path, PathBuf};

/// Key holding the serialized conversation collection.
const CONVERSATIONS_KEY: &str = "conversations";

/// Key holding the compact access token string.
const AUTH_TOKEN_KEY: &str = "auth_token";

/// Key holding the local guest flag.
const GUEST_MODE_KEY: &str = "guest_mode";

/// Display cap for the recent partition. The underlying store is unbounded.
pub const RECENT_LIMIT: usize = 15;

/// The pinned/recent split of the stored conversations
///
/// A conversation appears in exactly one of the two sequences: pinned
/// entries are excluded from `recent`, and `recent` is capped at
/// [`RECENT_LIMIT`]. Store order is preserved within each sequence.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Conversations manually pinned above the recent list
    pub pinned: Vec<Conversation>,
    /// Up to [`RECENT_LIMIT`] unpinned conversations
    pub recent: Vec<Conversation>,
}

/// Durable repository of conversations and local session data
///
/// One `SessionStore` owns one sled database file. Besides the
/// conversation collection it holds the access token and guest flag as
/// sibling single-value keys, so the whole client persists into one file.
pub struct SessionStore {
    db: Db,
}

impl SessionStore {
    /// Open the store at the default platform data directory
    ///
    /// The path can be overridden with the `MITRA_DB_PATH` environment
    /// variable, which makes it easy to point the binary at a test
    /// database without changing the user's application data dir.
    ///
    /// # Errors
    ///
    /// Returns `MitraError::Storage` if the data directory cannot be
    /// resolved or the database cannot be opened
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("MITRA_DB_PATH") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("ai", "mitra", "mitra")
            .ok_or_else(|| MitraError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| MitraError::Storage(e.to_string()))?;

        Self::new_with_path(data_dir.join("sessions.db"))
    }

    /// Open the store at the specified database path
    ///
    /// This is primarily useful for tests where the default application
    /// data directory is not desirable.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database directory
    ///
    /// # Errors
    ///
    /// Returns `MitraError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mitra::session::SessionStore;
    ///
    /// # fn main() -> mitra::error::Result<()> {
    /// let store = SessionStore::new_with_path("/tmp/sessions.db")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new_with_path(path: impl AsRef<Path>) -> Result<Self> {
        let path: PathBuf = path.as_ref().into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| MitraError::Storage(e.to_string()))?;
        }

        let db = sled::open(&path)
            .map_err(|e| MitraError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }

    /// List all conversations in upsert-history order
    ///
    /// The most-recently-saved conversation is first. Entries that fail
    /// to deserialize are dropped with a warning so a single corrupt
    /// record cannot block access to the rest of the history.
    ///
    /// # Errors
    ///
    /// Returns `MitraError::Storage` if the database read fails
    pub fn list(&self) -> Result<Vec<Conversation>> {
        let bytes = match self
            .db
            .get(CONVERSATIONS_KEY)
            .map_err(|e| MitraError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => bytes,
            None => return Ok(Vec::new()),
        };

        let raw: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Conversation collection unreadable, starting empty: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut conversations = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<Conversation>(value) {
                Ok(conversation) => conversations.push(conversation),
                Err(e) => {
                    tracing::warn!("Dropping unreadable conversation record: {}", e);
                }
            }
        }

        Ok(conversations)
    }

    /// Retrieve a conversation by id
    ///
    /// # Arguments
    ///
    /// * `id` - The conversation id to retrieve
    ///
    /// # Returns
    ///
    /// Returns Some(Conversation) if found, None if not found
    pub fn get(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.list()?.into_iter().find(|c| c.id == id))
    }

    /// Save a conversation, upserting by id
    ///
    /// If the id already exists the record is replaced in place,
    /// preserving its positional index; otherwise the conversation is
    /// prepended to the front of the collection. The whole collection is
    /// rewritten on every save.
    ///
    /// # Arguments
    ///
    /// * `conversation` - The conversation to persist
    ///
    /// # Errors
    ///
    /// Returns `MitraError::Storage` if serialization or the write fails
    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        let mut conversations = self.list()?;

        match conversations.iter().position(|c| c.id == conversation.id) {
            Some(index) => conversations[index] = conversation.clone(),
            None => conversations.insert(0, conversation.clone()),
        }

        self.write_collection(&conversations)
    }

    /// Remove a conversation by id
    ///
    /// Idempotent: removing an absent id succeeds without error. This is
    /// the only destructive operation on the collection.
    ///
    /// # Arguments
    ///
    /// * `id` - The conversation id to remove
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut conversations = self.list()?;
        let before = conversations.len();
        conversations.retain(|c| c.id != id);

        if conversations.len() == before {
            return Ok(());
        }

        self.write_collection(&conversations)
    }

    /// Split the stored conversations into pinned and recent views
    ///
    /// Pinned conversations are excluded from `recent`; `recent` is
    /// capped at [`RECENT_LIMIT`]. Store order is preserved.
    pub fn partition(&self) -> Result<Partition> {
        let mut partition = Partition::default();

        for conversation in self.list()? {
            if conversation.pinned {
                partition.pinned.push(conversation);
            } else if partition.recent.len() < RECENT_LIMIT {
                partition.recent.push(conversation);
            }
        }

        Ok(partition)
    }

    fn write_collection(&self, conversations: &[Conversation]) -> Result<()> {
        let value = serde_json::to_vec(conversations)
            .map_err(|e| MitraError::Storage(format!("Serialization failed: {}", e)))?;

        self.db
            .insert(CONVERSATIONS_KEY, value)
            .map_err(|e| MitraError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| MitraError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    /// Load the stored compact access token, if any
    pub fn load_token(&self) -> Result<Option<String>> {
        let bytes = self
            .db
            .get(AUTH_TOKEN_KEY)
            .map_err(|e| MitraError::Storage(format!("Get failed: {}", e)))?;

        Ok(bytes.map(|b| String::from_utf8_lossy(&b).to_string()))
    }

    /// Persist the compact access token
    pub fn save_token(&self, token: &str) -> Result<()> {
        self.db
            .insert(AUTH_TOKEN_KEY, token.as_bytes())
            .map_err(|e| MitraError::Storage(format!("Insert failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| MitraError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    /// Remove the stored access token, if any
    pub fn clear_token(&self) -> Result<()> {
        self.db
            .remove(AUTH_TOKEN_KEY)
            .map_err(|e| MitraError::Storage(format!("Remove failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| MitraError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    /// Whether the local guest flag is set
    pub fn guest_mode(&self) -> Result<bool> {
        let bytes = self
            .db
            .get(GUEST_MODE_KEY)
            .map_err(|e| MitraError::Storage(format!("Get failed: {}", e)))?;

        Ok(bytes.map(|b| b.as_ref() == b"true").unwrap_or(false))
    }

    /// Set or clear the local guest flag
    pub fn set_guest_mode(&self, enabled: bool) -> Result<()> {
        if enabled {
            self.db
                .insert(GUEST_MODE_KEY, b"true".to_vec())
                .map_err(|e| MitraError::Storage(format!("Insert failed: {}", e)))?;
        } else {
            self.db
                .remove(GUEST_MODE_KEY)
                .map_err(|e| MitraError::Storage(format!("Remove failed: {}", e)))?;
        }
        self.db
            .flush()
            .map_err(|e| MitraError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}
