use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};

use crate::gate::lock;

/// One transition of a navigator: the snapshot it replaced and the new one.
///
/// Both snapshots are immutable; holding on to an event never observes later
/// transitions.
#[derive(Debug)]
pub struct StateChanged<S> {
    pub previous: Arc<S>,
    pub current: Arc<S>,
}

impl<S> Clone for StateChanged<S> {
    fn clone(&self) -> Self {
        Self {
            previous: Arc::clone(&self.previous),
            current: Arc::clone(&self.current),
        }
    }
}

/// Fan-out of navigator events to channel subscribers.
///
/// Subscribers whose receiver was dropped are pruned on the next publish.
pub(crate) struct Broadcaster<E> {
    subscribers: Mutex<Vec<Sender<E>>>,
}

impl<E: Clone> Broadcaster<E> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = flume::unbounded();
        lock(&self.subscribers).push(tx);
        rx
    }

    pub(crate) fn publish(&self, event: &E) {
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

impl<E: Clone> Default for Broadcaster<E> {
    fn default() -> Self {
        Self::new()
    }
}
