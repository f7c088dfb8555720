//! Comment store adapter.
//!
//! Typed access to the `comments` collection. Persisted document shape:
//! `{ "comment": string, "created": timestamp, "user": email,
//!    "name": string, "taskID": string }`.
//!
//! The author identity is denormalized at post time and never refreshed.
//! Creation re-validates the parent task's visibility and deletion is
//! author-checked, both here in the store layer.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::store::{Collection, Doc, DocId, Query};
use crate::tasks::TaskStore;

const COMMENTS_COLLECTION: &str = "comments";

/// Persisted comment fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentFields {
    /// Comment body text
    pub comment: String,
    /// Creation timestamp
    pub created: DateTime<Utc>,
    /// Author email
    pub user: String,
    /// Author display name at time of posting
    pub name: String,
    /// Parent task id (relation, not ownership)
    #[serde(rename = "taskID")]
    pub task_id: DocId,
}

/// Typed adapter over the `comments` collection.
#[derive(Clone)]
pub struct CommentStore {
    collection: Collection<CommentFields>,
}

impl CommentStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            collection: Collection::open(data_dir, COMMENTS_COLLECTION),
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.collection = self.collection.with_lock_timeout(timeout_ms);
        self
    }

    /// Create a comment against a task, timestamped now.
    ///
    /// The parent task must exist and be public at creation time; a missing
    /// or private parent is rejected as denied, same as the detail page.
    pub fn create(
        &self,
        tasks: &TaskStore,
        identity: &Identity,
        task_id: &DocId,
        text: &str,
    ) -> Result<Doc<CommentFields>> {
        let parent = tasks.get(task_id)?;
        let visible = parent.map(|doc| doc.fields.public).unwrap_or(false);
        if !visible {
            return Err(Error::Denied(task_id.to_string()));
        }

        self.collection.create(CommentFields {
            comment: text.to_string(),
            created: Utc::now(),
            user: identity.email.clone(),
            name: identity.name.clone(),
            task_id: task_id.clone(),
        })
    }

    /// Fetch a comment by id.
    pub fn get(&self, id: &DocId) -> Result<Option<Doc<CommentFields>>> {
        self.collection.get(id)
    }

    /// Delete a comment. Rejects callers other than its author.
    pub fn delete(&self, identity: &Identity, id: &DocId) -> Result<()> {
        let doc = self
            .get(id)?
            .ok_or_else(|| Error::CommentNotFound(id.to_string()))?;
        if doc.fields.user != identity.email {
            return Err(Error::NotAuthorized {
                action: "delete comment".to_string(),
                id: id.to_string(),
            });
        }
        self.collection.delete(id)?;
        Ok(())
    }

    /// Total number of comments across all tasks.
    pub fn count(&self) -> Result<usize> {
        Ok(self.collection.query(&Query::all())?.len())
    }

    /// All comments of one task, in store insertion order (no re-sort).
    pub fn list_for_task(&self, task_id: &DocId) -> Result<Vec<Doc<CommentFields>>> {
        let wanted = task_id.clone();
        self.collection
            .query(&Query::filtered(move |doc: &Doc<CommentFields>| {
                doc.fields.task_id == wanted
            }))
    }
}
