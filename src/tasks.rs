//! Task store adapter.
//!
//! Typed access to the `tasks` collection. Persisted document shape:
//! `{ "task": string, "created": timestamp, "user": email, "public": bool }`.
//!
//! Tasks are immutable once created: the adapter exposes create, delete,
//! and reads, never an update. Deletion is owner-checked here, in the store
//! layer, not just at the presentation boundary.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::store::{Collection, Doc, DocId, Query, Subscription};

const TASKS_COLLECTION: &str = "tasks";

/// Persisted task fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFields {
    /// Task body text
    pub task: String,
    /// Creation timestamp, set once
    pub created: DateTime<Utc>,
    /// Owner email, set once
    pub user: String,
    /// Public visibility flag, immutable after creation
    pub public: bool,
}

/// Typed adapter over the `tasks` collection.
#[derive(Clone)]
pub struct TaskStore {
    collection: Collection<TaskFields>,
}

impl TaskStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            collection: Collection::open(data_dir, TASKS_COLLECTION),
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.collection = self.collection.with_lock_timeout(timeout_ms);
        self
    }

    /// Create a task owned by `identity`, timestamped now.
    pub fn create(&self, identity: &Identity, text: &str, public: bool) -> Result<Doc<TaskFields>> {
        self.collection.create(TaskFields {
            task: text.to_string(),
            created: Utc::now(),
            user: identity.email.clone(),
            public,
        })
    }

    /// Fetch a task by id.
    pub fn get(&self, id: &DocId) -> Result<Option<Doc<TaskFields>>> {
        self.collection.get(id)
    }

    /// Delete a task. Rejects callers other than the owner.
    pub fn delete(&self, identity: &Identity, id: &DocId) -> Result<()> {
        let doc = self
            .get(id)?
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        if doc.fields.user != identity.email {
            return Err(Error::NotAuthorized {
                action: "delete task".to_string(),
                id: id.to_string(),
            });
        }
        self.collection.delete(id)?;
        Ok(())
    }

    /// One-shot list of an owner's tasks, newest first.
    pub fn list_for_owner(&self, owner_email: &str) -> Result<Vec<Doc<TaskFields>>> {
        self.collection.query(&Self::owner_query(owner_email))
    }

    /// Standing owner-filtered subscription, newest first, re-emitting the
    /// full list on every change.
    pub fn subscribe_owner(&self, owner_email: &str) -> Result<Subscription<TaskFields>> {
        self.collection.subscribe(Self::owner_query(owner_email))
    }

    /// Total number of tasks across all owners.
    pub fn count(&self) -> Result<usize> {
        Ok(self.collection.query(&Query::all())?.len())
    }

    /// Number of live subscriptions on this store's handle family.
    pub fn watcher_count(&self) -> usize {
        self.collection.watcher_count()
    }

    fn owner_query(owner_email: &str) -> Query<TaskFields> {
        let owner = owner_email.to_string();
        Query::filtered(move |doc: &Doc<TaskFields>| doc.fields.user == owner)
            .order_by(|left, right| right.fields.created.cmp(&left.fields.created))
    }
}
