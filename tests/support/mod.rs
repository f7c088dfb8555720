#![allow(dead_code)]

use std::path::Path;

use tasklink::comments::CommentStore;
use tasklink::identity::Identity;
use tasklink::tasks::TaskStore;

/// A board backed by a temp data directory, with both stores open.
pub struct TestBoard {
    dir: tempfile::TempDir,
    pub tasks: TaskStore,
    pub comments: CommentStore,
}

impl TestBoard {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let tasks = TaskStore::open(dir.path());
        let comments = CommentStore::open(dir.path());
        Ok(Self {
            dir,
            tasks,
            comments,
        })
    }

    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }
}

pub fn user_a() -> Identity {
    Identity::new("a@x", "User A")
}

pub fn user_b() -> Identity {
    Identity::new("b@x", "User B")
}
