//! tasklink public task page commands: view, comment, uncomment.

use serde::Serialize;

use crate::cli::Globals;
use crate::comments::CommentStore;
use crate::config::Config;
use crate::detail::{resolve, Resolution, TaskSnapshot};
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::store::DocId;
use crate::tasks::TaskStore;
use crate::thread::{CommentThread, PostOutcome};

fn open_stores(globals: &Globals, config: &Config) -> (TaskStore, CommentStore) {
    let timeout = config.store.lock_timeout_ms;
    (
        TaskStore::open(&globals.data_dir).with_lock_timeout(timeout),
        CommentStore::open(&globals.data_dir).with_lock_timeout(timeout),
    )
}

#[derive(Serialize)]
struct CommentEntryReport {
    id: DocId,
    name: String,
    email: String,
    comment: String,
    /// Whether the caller authored this entry; only these expose a delete
    /// affordance.
    yours: bool,
}

#[derive(Serialize)]
struct ViewReport {
    task: TaskSnapshot,
    comments: Vec<CommentEntryReport>,
}

#[derive(Serialize)]
struct CommentReport {
    id: Option<DocId>,
    task_id: DocId,
    thread_len: usize,
}

#[derive(Serialize)]
struct UncommentReport {
    id: DocId,
}

pub fn run_view(globals: &Globals, id: &str) -> Result<()> {
    let config = globals.config();
    let id = DocId::from(id);
    let (tasks, comments) = open_stores(globals, &config);

    // The detail page is open to any caller; identity only decides which
    // comments show the delete affordance.
    let viewer = globals.identity(&config)?;

    let page = match resolve(&tasks, &comments, &id)? {
        Resolution::Denied => return Err(Error::Denied(id.to_string())),
        Resolution::Page(page) => page,
    };
    let thread = CommentThread::from_page(&page);

    let report = ViewReport {
        task: page.task.clone(),
        comments: thread
            .entries()
            .iter()
            .map(|entry| CommentEntryReport {
                id: entry.id.clone(),
                name: entry.author_name.clone(),
                email: entry.author_email.clone(),
                comment: entry.text.clone(),
                yours: viewer
                    .as_ref()
                    .map(|v| v.email == entry.author_email)
                    .unwrap_or(false),
            })
            .collect(),
    };

    let mut human = HumanOutput::new(format!("tasklink task: {}", page.task.text));
    human.push_summary("id", page.task.id.to_string());
    human.push_summary("created", page.task.created.clone());
    human.push_summary("comments", thread.len().to_string());
    if thread.is_empty() {
        human.push_detail("no comments yet".to_string());
    }
    for entry in &report.comments {
        let marker = if entry.yours { " (yours)" } else { "" };
        human.push_detail(format!("{}{marker}: {}", entry.name, entry.comment));
    }

    emit_success(globals.output(), "view", &report, Some(&human))
}

pub fn run_comment(globals: &Globals, task_id: &str, text: &str) -> Result<()> {
    let config = globals.config();
    let identity = globals.require_identity(&config)?;
    let task_id = DocId::from(task_id);
    let (tasks, comments) = open_stores(globals, &config);

    // Same gate as the page itself: a missing or private task denies the
    // whole interaction, not just the write.
    let page = match resolve(&tasks, &comments, &task_id)? {
        Resolution::Denied => return Err(Error::Denied(task_id.to_string())),
        Resolution::Page(page) => page,
    };

    let mut thread = CommentThread::from_page(&page);
    match thread.post(&comments, &tasks, Some(&identity), text.trim())? {
        PostOutcome::Posted(id) => {
            globals.emit_event(
                EventKind::CommentCreated,
                Some(&identity.email),
                serde_json::json!({ "id": id.as_str(), "task_id": task_id.as_str() }),
            );

            let report = CommentReport {
                id: Some(id.clone()),
                task_id: task_id.clone(),
                thread_len: thread.len(),
            };
            let mut human = HumanOutput::new(format!("tasklink comment: {}", text.trim()));
            human.push_summary("id", id.to_string());
            human.push_summary("task", task_id.to_string());
            human.push_summary("thread length", thread.len().to_string());

            emit_success(globals.output(), "comment", &report, Some(&human))
        }
        PostOutcome::Skipped => {
            let report = CommentReport {
                id: None,
                task_id: task_id.clone(),
                thread_len: thread.len(),
            };
            let mut human = HumanOutput::new("tasklink comment: nothing to post");
            human.push_warning("empty comment text");
            emit_success(globals.output(), "comment", &report, Some(&human))
        }
        PostOutcome::Failed => Err(Error::OperationFailed(
            "comment was not posted; see log for details".to_string(),
        )),
    }
}

pub fn run_uncomment(globals: &Globals, id: &str) -> Result<()> {
    let config = globals.config();
    let identity = globals.require_identity(&config)?;
    let id = DocId::from(id);
    let (_, comments) = open_stores(globals, &config);

    comments.delete(&identity, &id)?;

    globals.emit_event(
        EventKind::CommentDeleted,
        Some(&identity.email),
        serde_json::json!({ "id": id.as_str() }),
    );

    let report = UncommentReport { id: id.clone() };
    let mut human = HumanOutput::new(format!("tasklink uncomment: {id}"));
    human.push_summary("id", id.to_string());

    emit_success(globals.output(), "uncomment", &report, Some(&human))
}
