//! Dashboard sync engine.
//!
//! Maintains a live, ordered view of the current user's own tasks and
//! applies create/delete intents. The visible list is always a function of
//! store state: successful mutations show up through the subscription's
//! next emission, never through a local patch.

use std::time::Duration;

use tracing::{debug, error};

use crate::error::Result;
use crate::identity::Identity;
use crate::store::{Doc, DocId, Subscription};
use crate::tasks::{TaskFields, TaskStore};

/// Input scratch state for the task form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub public: bool,
}

/// Outcome of a create intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Task created; the id is store-assigned.
    Created(DocId),
    /// Empty text or missing identity: nothing attempted.
    Skipped,
    /// Store write failed; logged, draft kept for retry.
    Failed,
}

/// Live dashboard over one owner's tasks.
pub struct Dashboard {
    tasks: TaskStore,
    owner: Option<String>,
    subscription: Option<Subscription<TaskFields>>,
    draft: TaskDraft,
}

impl Dashboard {
    pub fn new(tasks: TaskStore) -> Self {
        Self {
            tasks,
            owner: None,
            subscription: None,
            draft: TaskDraft::default(),
        }
    }

    /// Switch the dashboard to a (possibly absent) owner.
    ///
    /// Any prior subscription is cancelled first, exactly once, so owner
    /// changes never leak listeners or overlap subscriptions. Setting the
    /// same owner again keeps the existing subscription.
    pub fn set_owner(&mut self, owner_email: Option<&str>) -> Result<()> {
        let next = owner_email.map(str::to_string);
        if self.owner == next && self.subscription.is_some() == next.is_some() {
            return Ok(());
        }

        if let Some(previous) = self.subscription.take() {
            previous.cancel();
        }
        self.owner = next;

        if let Some(email) = &self.owner {
            self.subscription = Some(self.tasks.subscribe_owner(email)?);
        }
        Ok(())
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Wait up to `timeout` for the next list emission (newest first).
    pub fn next_snapshot(&self, timeout: Duration) -> Option<Vec<Doc<TaskFields>>> {
        self.subscription
            .as_ref()
            .and_then(|sub| sub.recv_latest(timeout))
    }

    /// Non-blocking poll for a pending list emission.
    pub fn try_snapshot(&self) -> Option<Vec<Doc<TaskFields>>> {
        self.subscription.as_ref().and_then(|sub| sub.try_recv())
    }

    pub fn draft(&self) -> &TaskDraft {
        &self.draft
    }

    pub fn set_draft_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    pub fn set_draft_public(&mut self, public: bool) {
        self.draft.public = public;
    }

    /// Register the current draft as a task owned by `identity`.
    ///
    /// On success the draft is cleared (text emptied, public unchecked);
    /// on store failure it is kept intact so the user can retry.
    pub fn register_draft(&mut self, identity: &Identity) -> RegisterOutcome {
        let outcome = self.create_task(identity, &self.draft.text, self.draft.public);
        if matches!(outcome, RegisterOutcome::Created(_)) {
            self.draft = TaskDraft::default();
        }
        outcome
    }

    /// Create a task. Empty text is silently skipped (trimming is the
    /// caller's responsibility); store failures are logged and abandoned.
    pub fn create_task(&self, identity: &Identity, text: &str, public: bool) -> RegisterOutcome {
        if text.is_empty() {
            debug!(owner = %identity.email, "skipping empty task text");
            return RegisterOutcome::Skipped;
        }

        match self.tasks.create(identity, text, public) {
            Ok(doc) => RegisterOutcome::Created(doc.id),
            Err(err) => {
                error!(owner = %identity.email, error = %err, "task create failed");
                RegisterOutcome::Failed
            }
        }
    }

    /// Delete a task. Ownership is verified in the store layer; the
    /// rejection propagates so the caller can surface it.
    pub fn delete_task(&self, identity: &Identity, id: &DocId) -> Result<()> {
        self.tasks.delete(identity, id)
    }

    /// Whether a live subscription is currently established.
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::lock::FileLock;
    use crate::store::STORE_DIR;

    fn alice() -> Identity {
        Identity::new("a@x", "User A")
    }

    fn bob() -> Identity {
        Identity::new("b@x", "User B")
    }

    fn fixture() -> (tempfile::TempDir, TaskStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let tasks = TaskStore::open(dir.path());
        (dir, tasks)
    }

    const WAIT: Duration = Duration::from_secs(1);

    #[test]
    fn subscription_reflects_creates_and_deletes() {
        let (_dir, tasks) = fixture();
        let mut dashboard = Dashboard::new(tasks.clone());
        dashboard.set_owner(Some("a@x")).expect("set owner");

        assert!(dashboard.next_snapshot(WAIT).expect("initial").is_empty());

        let outcome = dashboard.create_task(&alice(), "Buy milk", true);
        let id = match outcome {
            RegisterOutcome::Created(id) => id,
            other => panic!("expected Created, got {other:?}"),
        };

        let snapshot = dashboard.next_snapshot(WAIT).expect("after create");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].fields.task, "Buy milk");

        dashboard.delete_task(&alice(), &id).expect("delete");
        let snapshot = dashboard.next_snapshot(WAIT).expect("after delete");
        assert!(snapshot.is_empty());
    }

    #[test]
    fn list_is_newest_first() {
        let (_dir, tasks) = fixture();
        let mut dashboard = Dashboard::new(tasks);
        dashboard.set_owner(Some("a@x")).expect("set owner");
        let _ = dashboard.next_snapshot(WAIT);

        dashboard.create_task(&alice(), "older", false);
        std::thread::sleep(Duration::from_millis(5));
        dashboard.create_task(&alice(), "newer", false);

        let snapshot = dashboard.next_snapshot(WAIT).expect("snapshot");
        let texts: Vec<_> = snapshot.iter().map(|d| d.fields.task.as_str()).collect();
        assert_eq!(texts, vec!["newer", "older"]);
    }

    #[test]
    fn foreign_tasks_never_appear() {
        let (_dir, tasks) = fixture();
        let mut dashboard = Dashboard::new(tasks.clone());
        dashboard.set_owner(Some("a@x")).expect("set owner");
        let _ = dashboard.next_snapshot(WAIT);

        tasks.create(&bob(), "not mine", true).expect("create");
        let snapshot = dashboard.next_snapshot(WAIT).expect("snapshot");
        assert!(snapshot.is_empty());
    }

    #[test]
    fn owner_change_tears_down_old_subscription() {
        let (_dir, tasks) = fixture();
        let mut dashboard = Dashboard::new(tasks.clone());

        dashboard.set_owner(Some("a@x")).expect("set owner");
        assert_eq!(tasks.watcher_count(), 1);

        dashboard.set_owner(Some("b@x")).expect("change owner");
        assert_eq!(tasks.watcher_count(), 1);

        // The new subscription sees b's world, not a's.
        let _ = dashboard.next_snapshot(WAIT);
        tasks.create(&bob(), "b task", false).expect("create");
        let snapshot = dashboard.next_snapshot(WAIT).expect("snapshot");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].fields.user, "b@x");
    }

    #[test]
    fn signing_out_cancels_the_subscription() {
        let (_dir, tasks) = fixture();
        let mut dashboard = Dashboard::new(tasks.clone());
        dashboard.set_owner(Some("a@x")).expect("set owner");
        assert!(dashboard.is_live());

        dashboard.set_owner(None).expect("sign out");
        assert!(!dashboard.is_live());
        assert_eq!(tasks.watcher_count(), 0);
    }

    #[test]
    fn setting_same_owner_keeps_subscription() {
        let (_dir, tasks) = fixture();
        let mut dashboard = Dashboard::new(tasks.clone());
        dashboard.set_owner(Some("a@x")).expect("set owner");
        let _ = dashboard.next_snapshot(WAIT);

        dashboard.set_owner(Some("a@x")).expect("same owner");
        assert_eq!(tasks.watcher_count(), 1);

        // Still receiving emissions on the original channel.
        tasks.create(&alice(), "ping", false).expect("create");
        assert!(dashboard.next_snapshot(WAIT).is_some());
    }

    #[test]
    fn empty_draft_is_skipped_with_zero_writes() {
        let (_dir, tasks) = fixture();
        let mut dashboard = Dashboard::new(tasks.clone());

        assert_eq!(dashboard.register_draft(&alice()), RegisterOutcome::Skipped);
        assert_eq!(dashboard.create_task(&alice(), "", true), RegisterOutcome::Skipped);
        assert!(tasks.list_for_owner("a@x").expect("list").is_empty());
    }

    #[test]
    fn draft_clears_on_success_and_survives_failure() {
        let (dir, _) = fixture();
        let tasks = TaskStore::open(dir.path()).with_lock_timeout(50);
        let mut dashboard = Dashboard::new(tasks);

        dashboard.set_draft_text("Buy milk");
        dashboard.set_draft_public(true);

        // Hold the collection lock so the engine's create times out.
        let lock_path = dir.path().join(STORE_DIR).join("tasks.lock");
        let held = FileLock::acquire(&lock_path, 1000).expect("hold lock");
        assert_eq!(dashboard.register_draft(&alice()), RegisterOutcome::Failed);
        assert_eq!(dashboard.draft().text, "Buy milk");
        assert!(dashboard.draft().public);
        drop(held);

        match dashboard.register_draft(&alice()) {
            RegisterOutcome::Created(_) => {}
            other => panic!("expected Created, got {other:?}"),
        }
        assert_eq!(dashboard.draft(), &TaskDraft::default());
    }

    #[test]
    fn delete_of_foreign_task_propagates_rejection() {
        let (_dir, tasks) = fixture();
        let doc = tasks.create(&bob(), "b task", true).expect("create");
        let dashboard = Dashboard::new(tasks);

        let err = dashboard
            .delete_task(&alice(), &doc.id)
            .expect_err("must reject");
        assert!(matches!(err, Error::NotAuthorized { .. }));
    }
}
