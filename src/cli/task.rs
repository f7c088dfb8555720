//! tasklink dashboard commands: add, list, rm, share.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::Globals;
use crate::comments::CommentStore;
use crate::config::Config;
use crate::dashboard::{Dashboard, RegisterOutcome};
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::share::{share_link, Clipboard, NullClipboard};
use crate::store::DocId;
use crate::tasks::TaskStore;

fn open_tasks(globals: &Globals, config: &Config) -> TaskStore {
    TaskStore::open(&globals.data_dir).with_lock_timeout(config.store.lock_timeout_ms)
}

#[derive(Serialize)]
struct AddReport {
    id: Option<DocId>,
    public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    share: Option<String>,
}

#[derive(Serialize)]
struct TaskReport {
    id: DocId,
    task: String,
    created: DateTime<Utc>,
    public: bool,
}

#[derive(Serialize)]
struct ListReport {
    owner: String,
    tasks: Vec<TaskReport>,
}

#[derive(Serialize)]
struct RmReport {
    id: DocId,
}

#[derive(Serialize)]
struct ShareReport {
    id: DocId,
    link: String,
}

#[derive(Serialize)]
struct StatsReport {
    tasks: usize,
    comments: usize,
}

pub fn run_add(globals: &Globals, text: &str, public: bool) -> Result<()> {
    let config = globals.config();
    let identity = globals.require_identity(&config)?;

    let mut dashboard = Dashboard::new(open_tasks(globals, &config));
    dashboard.set_draft_text(text.trim());
    dashboard.set_draft_public(public);

    match dashboard.register_draft(&identity) {
        RegisterOutcome::Created(id) => {
            globals.emit_event(
                EventKind::TaskCreated,
                Some(&identity.email),
                serde_json::json!({ "id": id.as_str(), "public": public }),
            );

            let share = public.then(|| share_link(&config.share.base_url, &id));
            let report = AddReport {
                id: Some(id.clone()),
                public,
                share: share.clone(),
            };

            let mut human = HumanOutput::new(format!("tasklink add: {}", text.trim()));
            human.push_summary("id", id.to_string());
            human.push_summary("public", public.to_string());
            if let Some(link) = share {
                human.push_detail(format!("share: {link}"));
            }

            emit_success(globals.output(), "add", &report, Some(&human))
        }
        RegisterOutcome::Skipped => {
            let report = AddReport {
                id: None,
                public,
                share: None,
            };
            let mut human = HumanOutput::new("tasklink add: nothing to register");
            human.push_warning("empty task text");
            emit_success(globals.output(), "add", &report, Some(&human))
        }
        RegisterOutcome::Failed => Err(Error::OperationFailed(
            "task was not registered; see log for details".to_string(),
        )),
    }
}

pub fn run_list(globals: &Globals) -> Result<()> {
    let config = globals.config();
    let identity = globals.require_identity(&config)?;

    // One-shot render of the live dashboard: establish the subscription and
    // take its initial emission.
    let mut dashboard = Dashboard::new(open_tasks(globals, &config));
    dashboard.set_owner(Some(&identity.email))?;
    let snapshot = dashboard
        .next_snapshot(std::time::Duration::from_secs(1))
        .unwrap_or_default();

    let report = ListReport {
        owner: identity.email.clone(),
        tasks: snapshot
            .iter()
            .map(|doc| TaskReport {
                id: doc.id.clone(),
                task: doc.fields.task.clone(),
                created: doc.fields.created,
                public: doc.fields.public,
            })
            .collect(),
    };

    let mut human = HumanOutput::new(format!(
        "tasklink list: {} task(s) for {}",
        report.tasks.len(),
        identity.email
    ));
    for task in &report.tasks {
        let tag = if task.public { " [public]" } else { "" };
        human.push_detail(format!("{}{tag}  {}", task.id, task.task));
    }
    if report.tasks.is_empty() {
        human.push_detail("no tasks yet".to_string());
    }

    emit_success(globals.output(), "list", &report, Some(&human))
}

pub fn run_rm(globals: &Globals, id: &str) -> Result<()> {
    let config = globals.config();
    let identity = globals.require_identity(&config)?;
    let id = DocId::from(id);

    let dashboard = Dashboard::new(open_tasks(globals, &config));
    dashboard.delete_task(&identity, &id)?;

    globals.emit_event(
        EventKind::TaskDeleted,
        Some(&identity.email),
        serde_json::json!({ "id": id.as_str() }),
    );

    let report = RmReport { id: id.clone() };
    let mut human = HumanOutput::new(format!("tasklink rm: {id}"));
    human.push_summary("id", id.to_string());

    emit_success(globals.output(), "rm", &report, Some(&human))
}

pub fn run_share(globals: &Globals, id: &str) -> Result<()> {
    let config = globals.config();
    let id = DocId::from(id);

    // Pure derivation from configuration; no store access. The clipboard
    // capability is external, so the default sink just drops the write.
    let link = share_link(&config.share.base_url, &id);
    let mut clipboard = NullClipboard;
    clipboard.write_text(&link)?;

    let report = ShareReport {
        id: id.clone(),
        link: link.clone(),
    };
    let mut human = HumanOutput::new(format!("tasklink share: {id}"));
    human.push_summary("link", link);

    emit_success(globals.output(), "share", &report, Some(&human))
}

pub fn run_stats(globals: &Globals) -> Result<()> {
    let config = globals.config();

    // Board totals are open to any caller, same as the home page counts.
    let tasks = open_tasks(globals, &config);
    let comments =
        CommentStore::open(&globals.data_dir).with_lock_timeout(config.store.lock_timeout_ms);

    let report = StatsReport {
        tasks: tasks.count()?,
        comments: comments.count()?,
    };

    let mut human = HumanOutput::new(format!(
        "tasklink stats: {} task(s), {} comment(s)",
        report.tasks, report.comments
    ));
    human.push_summary("tasks", report.tasks.to_string());
    human.push_summary("comments", report.comments.to_string());

    emit_success(globals.output(), "stats", &report, Some(&human))
}
