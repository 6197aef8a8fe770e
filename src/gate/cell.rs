use std::sync::{Arc, Mutex};

use crate::error::NavResult;
use crate::event::StateChanged;

use super::{RequestStatus, lock};

pub trait Snapshot {
    fn request_status(&self) -> RequestStatus;
}

#[derive(Debug)]
pub(crate) enum Admission<S> {
    /// The cell now holds this Processing snapshot.
    Accepted(Arc<S>),
    /// Another request is Processing; the new one is dropped.
    Busy,
    /// The start closure declined without touching the cell.
    Declined,
}

/// Compare-and-swap on an immutable-snapshot cell.
///
/// The mutex guards only the comparison against the current snapshot and the
/// pointer swap. Publishing happens while the swap is still exclusive, so
/// subscribers observe transitions in commit order. Nothing is awaited while
/// the lock is held.
///
/// A request admitted by [`try_begin`](Self::try_begin) keeps the cell busy
/// until [`commit`](Self::commit) ends it, whatever status intermediate
/// [`commit_if`](Self::commit_if) snapshots carry.
pub(crate) struct SnapshotCell<S> {
    inner: Mutex<Inner<S>>,
}

struct Inner<S> {
    current: Arc<S>,
    in_flight: bool,
}

impl<S> Inner<S> {
    fn swap<P>(&mut self, next: S, publish: P) -> Arc<S>
    where
        P: FnOnce(&StateChanged<S>),
    {
        let next = Arc::new(next);
        let previous = std::mem::replace(&mut self.current, Arc::clone(&next));
        publish(&StateChanged {
            previous,
            current: Arc::clone(&next),
        });
        next
    }
}

impl<S: Snapshot> SnapshotCell<S> {
    pub(crate) fn new(initial: S) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: Arc::new(initial),
                in_flight: false,
            }),
        }
    }

    pub(crate) fn load(&self) -> Arc<S> {
        Arc::clone(&lock(&self.inner).current)
    }

    /// Single-flight gate: installs the snapshot produced by `start` unless a
    /// request is in flight or the current snapshot is still Processing.
    pub(crate) fn try_begin<F, P>(&self, start: F, publish: P) -> NavResult<Admission<S>>
    where
        F: FnOnce(&S) -> NavResult<Option<S>>,
        P: FnOnce(&StateChanged<S>),
    {
        let mut inner = lock(&self.inner);
        if inner.in_flight || inner.current.request_status() == RequestStatus::Processing {
            return Ok(Admission::Busy);
        }
        let Some(next) = start(&inner.current)? else {
            return Ok(Admission::Declined);
        };
        inner.in_flight = true;
        Ok(Admission::Accepted(inner.swap(next, publish)))
    }

    /// Installs the snapshot that ends the request in flight.
    pub(crate) fn commit<F, P>(&self, next: F, publish: P) -> Arc<S>
    where
        F: FnOnce(&S) -> S,
        P: FnOnce(&StateChanged<S>),
    {
        let mut inner = lock(&self.inner);
        let next = next(&inner.current);
        inner.in_flight = false;
        inner.swap(next, publish)
    }

    /// Installs a snapshot produced outside the request lifecycle; `next` may
    /// leave the cell untouched.
    pub(crate) fn commit_if<F, P>(&self, next: F, publish: P) -> Option<Arc<S>>
    where
        F: FnOnce(&S) -> Option<S>,
        P: FnOnce(&StateChanged<S>),
    {
        let mut inner = lock(&self.inner);
        let next = next(&inner.current)?;
        Some(inner.swap(next, publish))
    }
}
