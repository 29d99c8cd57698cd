//! Lazy lesson loading.
//!
//! Each request templates the identifier into `cours/<id>.md` under the
//! course root and reads it on a short-lived background thread, delivering
//! a [`LoadOutcome`] over an mpsc channel. Requests are not deduplicated;
//! overlapping loads race. Every request carries a monotonically
//! increasing sequence token, and the event loop applies an outcome only
//! when its token matches the latest issued request — last-request-wins,
//! stale responses discarded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;

use thiserror::Error;

/// Directory under the course root holding lesson files.
pub const LESSON_DIR: &str = "cours";

/// Lesson file extension.
pub const LESSON_EXTENSION: &str = "md";

/// The single failure kind of a lesson load. Missing files and unreadable
/// bytes collapse into the same user-visible message.
#[derive(Debug, Error)]
#[error("could not load lesson `{id}`: {source}")]
pub struct LoadError {
    pub id: String,
    #[source]
    pub source: io::Error,
}

/// The settled result of one load request.
#[derive(Debug)]
pub struct LoadOutcome {
    /// Sequence token of the request that produced this outcome.
    pub seq: u64,
    /// The requested lesson identifier.
    pub id: String,
    pub result: Result<String, LoadError>,
}

impl LoadOutcome {
    /// An outcome is stale when a newer request was issued after it.
    pub fn is_stale(&self, latest_seq: u64) -> bool {
        self.seq != latest_seq
    }
}

/// Resolve a lesson identifier to its file path.
pub fn lesson_path(root: &Path, id: &str) -> PathBuf {
    root.join(LESSON_DIR).join(format!("{id}.{LESSON_EXTENSION}"))
}

/// Issues background load requests and hands outcomes to a channel.
pub struct Loader {
    root: PathBuf,
    tx: Sender<LoadOutcome>,
    next_seq: u64,
}

impl Loader {
    pub fn new(root: PathBuf, tx: Sender<LoadOutcome>) -> Self {
        Self {
            root,
            tx,
            next_seq: 0,
        }
    }

    /// Request a lesson load; returns the request's sequence token.
    ///
    /// Single attempt, no retry, no timeout: a slow read simply settles
    /// late (and is then discarded as stale if a newer request exists).
    pub fn request(&mut self, id: &str) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        let path = lesson_path(&self.root, id);
        let id = id.to_owned();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = fs::read_to_string(&path).map_err(|source| LoadError {
                id: id.clone(),
                source,
            });
            // The receiver may be gone during shutdown; nothing to do then.
            let _ = tx.send(LoadOutcome { seq, id, result });
        });
        seq
    }

    /// Token of the most recently issued request.
    pub fn latest_seq(&self) -> u64 {
        self.next_seq
    }
}
