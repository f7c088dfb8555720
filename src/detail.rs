//! Task detail resolver.
//!
//! Server-side, one-shot resolution of a single public task plus its full
//! comment thread. The public-visibility gate lives here: a missing or
//! private task resolves to `Denied` and the caller must redirect away,
//! never render task content.

use crate::comments::{CommentFields, CommentStore};
use crate::error::Result;
use crate::store::{Doc, DocId};
use crate::tasks::TaskStore;

/// Display date format used on the detail page
const CREATED_DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// Outcome of a detail resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Task missing or not public; redirect away.
    Denied,
    /// Task is public; render the page.
    Page(TaskPage),
}

impl Resolution {
    pub fn is_denied(&self) -> bool {
        matches!(self, Resolution::Denied)
    }
}

/// Resolved snapshot of a public task.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TaskSnapshot {
    pub id: DocId,
    pub text: String,
    pub owner: String,
    pub public: bool,
    /// Display-formatted creation date (`DD/MM/YYYY`), derived once at
    /// resolve time and never re-derived later.
    pub created: String,
}

/// One entry of the comment thread, as seen by the page.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CommentView {
    pub id: DocId,
    pub text: String,
    pub author_email: String,
    pub author_name: String,
    pub task_id: DocId,
}

impl CommentView {
    pub fn from_doc(doc: &Doc<CommentFields>) -> Self {
        Self {
            id: doc.id.clone(),
            text: doc.fields.comment.clone(),
            author_email: doc.fields.user.clone(),
            author_name: doc.fields.name.clone(),
            task_id: doc.fields.task_id.clone(),
        }
    }
}

/// The resolved page: task snapshot plus the full comment thread.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TaskPage {
    pub task: TaskSnapshot,
    /// Comments in store insertion order; no ordering is re-imposed here.
    pub comments: Vec<CommentView>,
}

/// Resolve a task id into a page or a denial.
///
/// Comments and task are fetched as two independent one-shot reads; a
/// failure of either aborts the whole resolution (no partial page).
pub fn resolve(tasks: &TaskStore, comments: &CommentStore, id: &DocId) -> Result<Resolution> {
    let comment_docs = comments.list_for_task(id)?;

    let Some(task) = tasks.get(id)? else {
        return Ok(Resolution::Denied);
    };
    if !task.fields.public {
        return Ok(Resolution::Denied);
    }

    Ok(Resolution::Page(TaskPage {
        task: TaskSnapshot {
            id: task.id,
            text: task.fields.task,
            owner: task.fields.user,
            public: task.fields.public,
            created: task
                .fields
                .created
                .format(CREATED_DISPLAY_FORMAT)
                .to_string(),
        },
        comments: comment_docs.iter().map(CommentView::from_doc).collect(),
    }))
}
