//! Commit hooks: the transactional boundary deferred tasks wait on.
//!
//! The backend only needs to know whether a transaction is active and to
//! register a callback that runs once it commits. [`CommitRegistrar`] is that
//! seam. [`Autocommit`] never holds a transaction; [`TransactionManager`] is
//! an in-process implementation with nested levels (savepoints).

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use oncommit_task::TaskError;

/// Zero-argument callback run after a successful commit.
pub type CommitCallback = Box<dyn FnOnce() + Send + 'static>;

/// Registers work to run after the active transaction commits.
pub trait CommitRegistrar: Send + Sync {
    /// Whether a transaction is currently open.
    fn in_transaction(&self) -> bool;

    /// Run `callback` after the active transaction commits, never if it
    /// rolls back. Without an active transaction the callback runs now.
    fn on_commit(&self, callback: CommitCallback);
}

/// Registrar for code running outside any transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct Autocommit;

impl CommitRegistrar for Autocommit {
    fn in_transaction(&self) -> bool {
        false
    }

    fn on_commit(&self, callback: CommitCallback) {
        callback();
    }
}

/// In-process transaction tracker.
///
/// Each open level holds the callbacks registered while it was innermost.
/// Committing a nested level hands its callbacks to the enclosing level;
/// committing the outermost level runs them in registration order.
/// Rolling back a level discards its callbacks and those of any level
/// nested inside it.
#[derive(Default)]
pub struct TransactionManager {
    levels: Mutex<Levels>,
}

#[derive(Default)]
struct Levels {
    open: Vec<Level>,
    next_id: u64,
}

struct Level {
    id: u64,
    callbacks: Vec<CommitCallback>,
}

impl Levels {
    fn position(&self, id: u64) -> Option<usize> {
        self.open.iter().position(|level| level.id == id)
    }
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open levels (0 = no transaction).
    pub fn depth(&self) -> usize {
        self.levels.lock().open.len()
    }

    /// Open a transaction, or a savepoint if one is already open.
    pub fn atomic(self: &Arc<Self>) -> Atomic {
        let (id, depth) = {
            let mut levels = self.levels.lock();
            let id = levels.next_id;
            levels.next_id += 1;
            levels.open.push(Level {
                id,
                callbacks: Vec::new(),
            });
            (id, levels.open.len())
        };
        debug!(depth, level_id = id, "Opened transaction level");
        Atomic {
            manager: Arc::clone(self),
            id,
            depth,
            finished: false,
        }
    }

    /// Run `f` inside a new level: commit on `Ok`, roll back on `Err`.
    pub fn run<T, E, F>(self: &Arc<Self>, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<TaskError>,
    {
        let atomic = self.atomic();
        match f() {
            Ok(value) => {
                atomic.commit()?;
                Ok(value)
            }
            Err(e) => {
                atomic.rollback();
                Err(e)
            }
        }
    }
}

impl fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels = self.levels.lock();
        f.debug_struct("TransactionManager")
            .field("depth", &levels.open.len())
            .field(
                "pending_callbacks",
                &levels
                    .open
                    .iter()
                    .map(|level| level.callbacks.len())
                    .sum::<usize>(),
            )
            .finish()
    }
}

impl CommitRegistrar for TransactionManager {
    fn in_transaction(&self) -> bool {
        !self.levels.lock().open.is_empty()
    }

    fn on_commit(&self, callback: CommitCallback) {
        {
            let mut levels = self.levels.lock();
            if let Some(level) = levels.open.last_mut() {
                level.callbacks.push(callback);
                return;
            }
        }
        // No transaction: the lock is released before running user code.
        callback();
    }
}

/// Guard for one open transaction level.
///
/// Dropping the guard without calling [`Atomic::commit`] rolls the level back.
/// A guard only ever acts on the level it opened: once that level is gone
/// (rolled back by an enclosing guard), committing it fails and dropping it
/// does nothing.
#[must_use = "dropping an Atomic guard rolls the transaction back"]
pub struct Atomic {
    manager: Arc<TransactionManager>,
    id: u64,
    depth: usize,
    finished: bool,
}

impl Atomic {
    /// Nesting depth of this level (1 = outermost).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Commit this level.
    ///
    /// Only the innermost open level can be committed; committing any other
    /// level fails and rolls this level (and everything inside it) back.
    pub fn commit(mut self) -> Result<(), TaskError> {
        let callbacks = {
            let mut levels = self.manager.levels.lock();
            match levels.position(self.id) {
                None => {
                    self.finished = true;
                    return Err(TaskError::Transaction(format!(
                        "transaction level {} is no longer open",
                        self.depth
                    )));
                }
                Some(index) if index + 1 != levels.open.len() => {
                    return Err(TaskError::Transaction(format!(
                        "cannot commit level {} while {} levels are open",
                        self.depth,
                        levels.open.len()
                    )));
                }
                Some(_) => {}
            }
            let level = levels.open.pop().map(|level| level.callbacks).unwrap_or_default();
            self.finished = true;

            if let Some(parent) = levels.open.last_mut() {
                debug!(
                    depth = self.depth,
                    callbacks = level.len(),
                    "Released savepoint"
                );
                parent.callbacks.extend(level);
                return Ok(());
            }
            level
        };

        debug!(callbacks = callbacks.len(), "Committed transaction");
        for callback in callbacks {
            callback();
        }
        Ok(())
    }

    /// Roll this level back, discarding its commit callbacks.
    pub fn rollback(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let mut levels = self.manager.levels.lock();
        if let Some(index) = levels.position(self.id) {
            let discarded: usize = levels.open[index..]
                .iter()
                .map(|level| level.callbacks.len())
                .sum();
            levels.open.truncate(index);
            debug!(
                depth = self.depth,
                discarded, "Rolled back transaction level"
            );
        }
    }
}

impl Drop for Atomic {
    fn drop(&mut self) {
        self.discard();
    }
}

impl fmt::Debug for Atomic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atomic")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .field("finished", &self.finished)
            .finish()
    }
}
