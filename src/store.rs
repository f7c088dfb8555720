//! Document store primitive.
//!
//! A `Collection<T>` is a named set of JSON documents persisted as one JSONL
//! file under the store directory (`<data_dir>/store/<name>.jsonl`), with:
//! - store-assigned ULID ids; documents are appended, so file order is
//!   insertion order
//! - create/delete guarded by a sibling file lock plus atomic rewrite
//! - one-shot reads (`get`, `query`)
//! - live queries (`subscribe`): a registered watcher receives a fresh full
//!   snapshot after every matching change until cancelled
//!
//! Live notifications are in-process: they reach watchers registered on
//! clones of the same collection handle. Durability across processes comes
//! from the locked file, not from the watcher registry.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lock::{write_atomic, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Name of the store directory inside the data directory
pub const STORE_DIR: &str = "store";

/// Opaque, store-assigned document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Mint a fresh id. Lowercased ULID, so ids stay URL-friendly.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A document: its id plus the typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Doc<T> {
    pub id: DocId,
    pub fields: T,
}

/// On-disk line shape: the fields with the id inlined as `_id`.
#[derive(Serialize, Deserialize)]
struct Stored<T> {
    #[serde(rename = "_id")]
    id: DocId,
    #[serde(flatten)]
    fields: T,
}

/// A filter plus optional ordering over the documents of one collection.
pub struct Query<T> {
    filter: Arc<dyn Fn(&Doc<T>) -> bool + Send + Sync>,
    order: Option<Arc<dyn Fn(&Doc<T>, &Doc<T>) -> Ordering + Send + Sync>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            filter: Arc::clone(&self.filter),
            order: self.order.as_ref().map(Arc::clone),
        }
    }
}

impl<T> Query<T> {
    /// Match every document, in insertion order.
    pub fn all() -> Self {
        Self {
            filter: Arc::new(|_| true),
            order: None,
        }
    }

    /// Match documents satisfying the predicate.
    pub fn filtered(filter: impl Fn(&Doc<T>) -> bool + Send + Sync + 'static) -> Self {
        Self {
            filter: Arc::new(filter),
            order: None,
        }
    }

    /// Sort the result set with the comparator.
    pub fn order_by(
        mut self,
        order: impl Fn(&Doc<T>, &Doc<T>) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.order = Some(Arc::new(order));
        self
    }

    fn apply(&self, docs: &[Doc<T>]) -> Vec<Doc<T>>
    where
        T: Clone,
    {
        let mut matched: Vec<Doc<T>> = docs
            .iter()
            .filter(|doc| (self.filter)(doc))
            .cloned()
            .collect();
        if let Some(order) = &self.order {
            matched.sort_by(|left, right| order(left, right));
        }
        matched
    }
}

struct Watcher<T> {
    token: Uuid,
    query: Query<T>,
    tx: Sender<Vec<Doc<T>>>,
}

type WatcherTable<T> = Arc<Mutex<Vec<Watcher<T>>>>;

/// Typed access to one document collection.
pub struct Collection<T> {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout_ms: u64,
    watchers: WatcherTable<T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            lock_path: self.lock_path.clone(),
            lock_timeout_ms: self.lock_timeout_ms,
            watchers: Arc::clone(&self.watchers),
        }
    }
}

impl<T> Collection<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// Open the named collection under `<data_dir>/store/`.
    pub fn open(data_dir: &Path, name: &str) -> Self {
        let store_dir = data_dir.join(STORE_DIR);
        Self {
            path: store_dir.join(format!("{name}.jsonl")),
            lock_path: store_dir.join(format!("{name}.lock")),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            watchers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Override the lock timeout (from `[store] lock_timeout_ms`).
    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Create a document with a store-assigned id.
    pub fn create(&self, fields: T) -> Result<Doc<T>> {
        let doc = Doc {
            id: DocId::generate(),
            fields,
        };

        let _lock = FileLock::acquire(&self.lock_path, self.lock_timeout_ms)?;
        let mut docs = self.read_all()?;
        docs.push(doc.clone());
        self.write_all(&docs)?;
        drop(_lock);

        self.notify(&docs);
        Ok(doc)
    }

    /// Delete a document by id. Returns whether a document was removed.
    pub fn delete(&self, id: &DocId) -> Result<bool> {
        let _lock = FileLock::acquire(&self.lock_path, self.lock_timeout_ms)?;
        let mut docs = self.read_all()?;
        let before = docs.len();
        docs.retain(|doc| doc.id != *id);
        let removed = docs.len() != before;
        if removed {
            self.write_all(&docs)?;
        }
        drop(_lock);

        if removed {
            self.notify(&docs);
        }
        Ok(removed)
    }

    /// Fetch a single document by id.
    pub fn get(&self, id: &DocId) -> Result<Option<Doc<T>>> {
        let docs = self.read_all()?;
        Ok(docs.into_iter().find(|doc| doc.id == *id))
    }

    /// One-shot query: filtered, optionally ordered snapshot.
    pub fn query(&self, query: &Query<T>) -> Result<Vec<Doc<T>>> {
        let docs = self.read_all()?;
        Ok(query.apply(&docs))
    }

    /// Establish a live query. The subscription immediately receives the
    /// current snapshot, then a fresh one after every mutation, until
    /// cancelled (explicitly or on drop).
    pub fn subscribe(&self, query: Query<T>) -> Result<Subscription<T>> {
        let (tx, rx) = mpsc::channel();

        let initial = self.query(&query)?;
        let _ = tx.send(initial);

        let token = Uuid::new_v4();
        let mut watchers = self
            .watchers
            .lock()
            .map_err(|_| Error::OperationFailed("watcher registry poisoned".to_string()))?;
        watchers.push(Watcher { token, query, tx });
        drop(watchers);

        Ok(Subscription {
            token,
            rx,
            watchers: Arc::clone(&self.watchers),
            active: true,
        })
    }

    /// Number of live watchers on this collection handle family.
    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().map(|table| table.len()).unwrap_or(0)
    }

    fn read_all(&self) -> Result<Vec<Doc<T>>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let mut docs = Vec::new();
        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Stored<T>>(line) {
                Ok(stored) => docs.push(Doc {
                    id: stored.id,
                    fields: stored.fields,
                }),
                Err(err) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = index + 1,
                        error = %err,
                        "skipping unreadable document line"
                    );
                }
            }
        }
        Ok(docs)
    }

    fn write_all(&self, docs: &[Doc<T>]) -> Result<()> {
        let mut out = String::new();
        for doc in docs {
            let stored = Stored {
                id: doc.id.clone(),
                fields: doc.fields.clone(),
            };
            out.push_str(&serde_json::to_string(&stored)?);
            out.push('\n');
        }
        write_atomic(&self.path, out.as_bytes())
    }

    /// Push a fresh snapshot to every watcher whose receiver is still alive.
    fn notify(&self, docs: &[Doc<T>]) {
        let Ok(mut watchers) = self.watchers.lock() else {
            return;
        };
        watchers.retain(|watcher| {
            let snapshot = watcher.query.apply(docs);
            watcher.tx.send(snapshot).is_ok()
        });
    }
}

/// A cancellable live query handle.
///
/// Cancellation happens exactly once: either through `cancel` or on drop,
/// whichever comes first.
pub struct Subscription<T> {
    token: Uuid,
    rx: Receiver<Vec<Doc<T>>>,
    watchers: WatcherTable<T>,
    active: bool,
}

impl<T> Subscription<T> {
    /// Wait up to `timeout` for the next snapshot.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Vec<Doc<T>>> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Non-blocking poll for a pending snapshot.
    pub fn try_recv(&self) -> Option<Vec<Doc<T>>> {
        self.rx.try_recv().ok()
    }

    /// Wait for a snapshot, then drain any further pending ones, returning
    /// the most recent. Each snapshot is already complete, so intermediate
    /// ones carry no extra information.
    pub fn recv_latest(&self, timeout: Duration) -> Option<Vec<Doc<T>>> {
        let mut latest = self.rx.recv_timeout(timeout).ok()?;
        while let Ok(newer) = self.rx.try_recv() {
            latest = newer;
        }
        Some(latest)
    }

    /// Cancel the subscription, deregistering its watcher.
    pub fn cancel(mut self) {
        self.deregister();
    }

    fn deregister(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.retain(|watcher| watcher.token != self.token);
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.deregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        label: String,
        rank: u32,
    }

    fn collection(dir: &tempfile::TempDir) -> Collection<Note> {
        Collection::open(dir.path(), "notes")
    }

    fn note(label: &str, rank: u32) -> Note {
        Note {
            label: label.to_string(),
            rank,
        }
    }

    #[test]
    fn create_get_delete_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = collection(&dir);

        let doc = notes.create(note("first", 1)).expect("create");
        let fetched = notes.get(&doc.id).expect("get").expect("present");
        assert_eq!(fetched.fields, note("first", 1));

        assert!(notes.delete(&doc.id).expect("delete"));
        assert!(notes.get(&doc.id).expect("get").is_none());
        assert!(!notes.delete(&doc.id).expect("second delete"));
    }

    #[test]
    fn query_filters_and_orders() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = collection(&dir);
        notes.create(note("a", 3)).expect("create");
        notes.create(note("b", 1)).expect("create");
        notes.create(note("skip", 9)).expect("create");

        let query = Query::filtered(|doc: &Doc<Note>| doc.fields.label != "skip")
            .order_by(|l, r| l.fields.rank.cmp(&r.fields.rank));
        let result = notes.query(&query).expect("query");
        let labels: Vec<_> = result.iter().map(|d| d.fields.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a"]);
    }

    #[test]
    fn unfiltered_query_preserves_insertion_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = collection(&dir);
        for label in ["one", "two", "three"] {
            notes.create(note(label, 0)).expect("create");
        }

        let result = notes.query(&Query::all()).expect("query");
        let labels: Vec<_> = result.iter().map(|d| d.fields.label.as_str()).collect();
        assert_eq!(labels, vec!["one", "two", "three"]);
    }

    #[test]
    fn subscribe_delivers_initial_and_change_snapshots() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = collection(&dir);
        notes.create(note("seed", 0)).expect("create");

        let sub = notes.subscribe(Query::all()).expect("subscribe");
        let initial = sub.try_recv().expect("initial snapshot");
        assert_eq!(initial.len(), 1);

        notes.create(note("next", 1)).expect("create");
        let updated = sub
            .recv_timeout(Duration::from_secs(1))
            .expect("update snapshot");
        assert_eq!(updated.len(), 2);
    }

    #[test]
    fn subscription_filter_hides_non_matching_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = collection(&dir);

        let sub = notes
            .subscribe(Query::filtered(|doc: &Doc<Note>| doc.fields.rank > 5))
            .expect("subscribe");
        assert!(sub.try_recv().expect("initial").is_empty());

        notes.create(note("low", 1)).expect("create");
        // The snapshot re-fires on the change, but the filtered view is
        // still empty.
        let snapshot = sub.recv_timeout(Duration::from_secs(1)).expect("snapshot");
        assert!(snapshot.is_empty());
    }

    #[test]
    fn cancel_deregisters_exactly_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = collection(&dir);

        let sub = notes.subscribe(Query::all()).expect("subscribe");
        assert_eq!(notes.watcher_count(), 1);
        sub.cancel();
        assert_eq!(notes.watcher_count(), 0);

        // A cancelled-then-dropped subscription must not disturb others.
        let keep = notes.subscribe(Query::all()).expect("subscribe");
        let gone = notes.subscribe(Query::all()).expect("subscribe");
        assert_eq!(notes.watcher_count(), 2);
        gone.cancel();
        assert_eq!(notes.watcher_count(), 1);
        drop(keep);
        assert_eq!(notes.watcher_count(), 0);
    }

    #[test]
    fn drop_deregisters_watcher() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = collection(&dir);
        {
            let _sub = notes.subscribe(Query::all()).expect("subscribe");
            assert_eq!(notes.watcher_count(), 1);
        }
        assert_eq!(notes.watcher_count(), 0);
    }

    #[test]
    fn clones_share_the_watcher_registry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = collection(&dir);
        let writer = notes.clone();

        let sub = notes.subscribe(Query::all()).expect("subscribe");
        let _ = sub.try_recv();

        writer.create(note("from clone", 1)).expect("create");
        let snapshot = sub.recv_timeout(Duration::from_secs(1)).expect("snapshot");
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn unreadable_lines_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = collection(&dir);
        let doc = notes.create(note("good", 1)).expect("create");

        let path = dir.path().join(STORE_DIR).join("notes.jsonl");
        let mut raw = std::fs::read_to_string(&path).expect("read");
        raw.push_str("not json at all\n");
        std::fs::write(&path, raw).expect("write");

        let docs = notes.query(&Query::all()).expect("query");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, doc.id);
    }

    #[test]
    fn ids_are_unique_and_lowercase() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = collection(&dir);
        let first = notes.create(note("a", 1)).expect("create");
        let second = notes.create(note("b", 2)).expect("create");
        assert_ne!(first.id, second.id);
        assert_eq!(first.id.as_str(), first.id.as_str().to_lowercase());
    }
}
