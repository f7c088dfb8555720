//! Comment thread engine.
//!
//! Client-side append/delete of comments against one task. The visible
//! thread starts from the detail resolver's snapshot; posting appends the
//! new entry optimistically with the store-assigned id (one round trip, no
//! re-fetch), so other viewers only see it after they re-resolve.

use tracing::{debug, error};

use crate::comments::CommentStore;
use crate::detail::{CommentView, TaskPage};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::store::DocId;
use crate::tasks::TaskStore;

/// Outcome of a post intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// Comment created and appended locally; id is store-assigned.
    Posted(DocId),
    /// Empty text or missing identity: nothing attempted.
    Skipped,
    /// Store write failed; logged, thread unchanged.
    Failed,
}

/// The locally visible comment thread of one task.
#[derive(Debug, Clone)]
pub struct CommentThread {
    task_id: DocId,
    entries: Vec<CommentView>,
}

impl CommentThread {
    /// Seed the thread from a resolved page snapshot.
    pub fn from_page(page: &TaskPage) -> Self {
        Self {
            task_id: page.task.id.clone(),
            entries: page.comments.clone(),
        }
    }

    pub fn seeded(task_id: DocId, entries: Vec<CommentView>) -> Self {
        Self { task_id, entries }
    }

    pub fn task_id(&self) -> &DocId {
        &self.task_id
    }

    pub fn entries(&self) -> &[CommentView] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The empty-state indicator keys off the current local length, not the
    /// server-seeded count, since entries can be appended in-session.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Post a comment as `identity`, appending it locally on success.
    ///
    /// Empty text or an absent identity is a silent no-op. Authorization
    /// rejections (private/missing parent) propagate; store write failures
    /// are logged and abandoned.
    pub fn post(
        &mut self,
        comments: &CommentStore,
        tasks: &TaskStore,
        identity: Option<&Identity>,
        text: &str,
    ) -> Result<PostOutcome> {
        if text.is_empty() {
            debug!(task = %self.task_id, "skipping empty comment");
            return Ok(PostOutcome::Skipped);
        }
        let Some(identity) = identity else {
            debug!(task = %self.task_id, "skipping comment without identity");
            return Ok(PostOutcome::Skipped);
        };

        match comments.create(tasks, identity, &self.task_id, text) {
            Ok(doc) => {
                self.entries.push(CommentView::from_doc(&doc));
                Ok(PostOutcome::Posted(doc.id))
            }
            Err(err) if err.is_store_failure() => {
                error!(task = %self.task_id, error = %err, "comment create failed");
                Ok(PostOutcome::Failed)
            }
            Err(err) => Err(err),
        }
    }

    /// Remove a comment authored by `identity`.
    ///
    /// The author check happens in the store layer and aborts the local
    /// removal on rejection. A store write failure after the check is
    /// logged and the entry is still dropped locally (no rollback).
    pub fn remove(
        &mut self,
        comments: &CommentStore,
        identity: &Identity,
        id: &DocId,
    ) -> Result<()> {
        match comments.delete(identity, id) {
            Ok(()) => {}
            Err(err) if err.is_store_failure() => {
                error!(comment = %id, error = %err, "comment delete failed");
            }
            Err(err) => return Err(err),
        }
        self.entries.retain(|entry| entry.id != *id);
        Ok(())
    }

    /// Reconcile the local thread with an authoritative server list.
    pub fn reconcile(&mut self, server: Vec<CommentView>) {
        self.entries = merge_with_server(&self.entries, server);
    }

    /// Re-fetch the thread and merge, keeping local pending entries.
    pub fn refresh(&mut self, comments: &CommentStore) -> Result<()> {
        let server = comments
            .list_for_task(&self.task_id)?
            .iter()
            .map(CommentView::from_doc)
            .collect();
        self.reconcile(server);
        Ok(())
    }
}

/// Merge the local thread with an authoritative server list, by id.
///
/// Server entries come first in server order; local entries the server has
/// not yet reflected (pending) follow in local order. Pure function.
pub fn merge_with_server(local: &[CommentView], server: Vec<CommentView>) -> Vec<CommentView> {
    let mut merged = server;
    let confirmed: std::collections::HashSet<&DocId> =
        merged.iter().map(|entry| &entry.id).collect();
    let pending: Vec<CommentView> = local
        .iter()
        .filter(|entry| !confirmed.contains(&entry.id))
        .cloned()
        .collect();
    merged.extend(pending);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detail::{resolve, Resolution};

    struct Fixture {
        _dir: tempfile::TempDir,
        tasks: TaskStore,
        comments: CommentStore,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        Fixture {
            tasks: TaskStore::open(dir.path()),
            comments: CommentStore::open(dir.path()),
            _dir: dir,
        }
    }

    fn alice() -> Identity {
        Identity::new("a@x", "User A")
    }

    fn bob() -> Identity {
        Identity::new("b@x", "User B")
    }

    fn view(id: &str, text: &str) -> CommentView {
        CommentView {
            id: DocId::from(id),
            text: text.to_string(),
            author_email: "a@x".to_string(),
            author_name: "User A".to_string(),
            task_id: DocId::from("t1"),
        }
    }

    fn page_thread(fx: &Fixture, id: &DocId) -> CommentThread {
        match resolve(&fx.tasks, &fx.comments, id).expect("resolve") {
            Resolution::Page(page) => CommentThread::from_page(&page),
            Resolution::Denied => panic!("expected a page"),
        }
    }

    #[test]
    fn post_appends_optimistically_with_store_id() {
        let fx = fixture();
        let task = fx.tasks.create(&alice(), "Buy milk", true).expect("task");
        let mut thread = page_thread(&fx, &task.id);
        assert!(thread.is_empty());

        let outcome = thread
            .post(&fx.comments, &fx.tasks, Some(&bob()), "Got it")
            .expect("post");
        let PostOutcome::Posted(id) = outcome else {
            panic!("expected Posted");
        };

        assert_eq!(thread.len(), 1);
        assert_eq!(thread.entries()[0].id, id);
        assert_eq!(thread.entries()[0].text, "Got it");
        assert_eq!(thread.entries()[0].author_name, "User B");
        assert!(!thread.is_empty());

        // The store has it too: an independent re-resolve sees the entry.
        let other_client = page_thread(&fx, &task.id);
        assert_eq!(other_client.len(), 1);
        assert_eq!(other_client.entries()[0].id, id);
    }

    #[test]
    fn post_skips_empty_text_and_missing_identity() {
        let fx = fixture();
        let task = fx.tasks.create(&alice(), "Buy milk", true).expect("task");
        let mut thread = page_thread(&fx, &task.id);

        let skipped = thread
            .post(&fx.comments, &fx.tasks, Some(&bob()), "")
            .expect("post");
        assert_eq!(skipped, PostOutcome::Skipped);

        let skipped = thread
            .post(&fx.comments, &fx.tasks, None, "anonymous")
            .expect("post");
        assert_eq!(skipped, PostOutcome::Skipped);

        assert!(thread.is_empty());
        assert!(fx.comments.list_for_task(&task.id).expect("list").is_empty());
    }

    #[test]
    fn post_against_private_task_propagates_denial() {
        let fx = fixture();
        let task = fx.tasks.create(&alice(), "Draft", false).expect("task");
        let mut thread = CommentThread::seeded(task.id.clone(), Vec::new());

        let err = thread
            .post(&fx.comments, &fx.tasks, Some(&bob()), "hello?")
            .expect_err("must deny");
        assert!(matches!(err, Error::Denied(_)));
        assert!(thread.is_empty());
    }

    #[test]
    fn remove_deletes_own_comment_locally_and_in_store() {
        let fx = fixture();
        let task = fx.tasks.create(&alice(), "Buy milk", true).expect("task");
        let mut thread = page_thread(&fx, &task.id);
        let outcome = thread
            .post(&fx.comments, &fx.tasks, Some(&bob()), "Got it")
            .expect("post");
        let PostOutcome::Posted(id) = outcome else {
            panic!("expected Posted");
        };

        thread.remove(&fx.comments, &bob(), &id).expect("remove");
        assert_eq!(thread.len(), 0);
        assert!(fx.comments.list_for_task(&task.id).expect("list").is_empty());
    }

    #[test]
    fn remove_of_foreign_comment_is_rejected_and_kept() {
        let fx = fixture();
        let task = fx.tasks.create(&alice(), "Buy milk", true).expect("task");
        let doc = fx
            .comments
            .create(&fx.tasks, &bob(), &task.id, "b's comment")
            .expect("comment");
        let mut thread = page_thread(&fx, &task.id);

        let err = thread
            .remove(&fx.comments, &alice(), &doc.id)
            .expect_err("must reject");
        assert!(matches!(err, Error::NotAuthorized { .. }));
        assert_eq!(thread.len(), 1);
    }

    #[test]
    fn refresh_picks_up_other_clients_comments() {
        let fx = fixture();
        let task = fx.tasks.create(&alice(), "Buy milk", true).expect("task");
        let mut thread = page_thread(&fx, &task.id);
        thread
            .post(&fx.comments, &fx.tasks, Some(&bob()), "mine")
            .expect("post");

        // Another client posts through its own thread.
        let mut other = page_thread(&fx, &task.id);
        other
            .post(&fx.comments, &fx.tasks, Some(&alice()), "theirs")
            .expect("post");

        thread.refresh(&fx.comments).expect("refresh");
        let texts: Vec<_> = thread.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["mine", "theirs"]);
    }

    #[test]
    fn merge_keeps_server_order_and_appends_pending() {
        let local = vec![view("c1", "confirmed"), view("c9", "pending")];
        let server = vec![view("c1", "confirmed"), view("c2", "from elsewhere")];

        let merged = merge_with_server(&local, server);
        let ids: Vec<_> = merged.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c9"]);
    }

    #[test]
    fn merge_never_duplicates_by_id() {
        let local = vec![view("c1", "local copy")];
        let server = vec![view("c1", "server copy")];

        let merged = merge_with_server(&local, server);
        assert_eq!(merged.len(), 1);
        // The server version is authoritative.
        assert_eq!(merged[0].text, "server copy");
    }

    #[test]
    fn merge_with_empty_sides() {
        assert!(merge_with_server(&[], Vec::new()).is_empty());

        let only_local = merge_with_server(&[view("c1", "x")], Vec::new());
        assert_eq!(only_local.len(), 1);

        let only_server = merge_with_server(&[], vec![view("c2", "y")]);
        assert_eq!(only_server.len(), 1);
    }
}
