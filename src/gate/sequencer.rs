use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::lock;

/// A logical navigator operation, made of one or more requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationOperation {
    pub name: &'static str,
    pub sequence_id: u64,
}

impl fmt::Display for NavigationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.name, self.sequence_id)
    }
}

/// Hands out monotonically increasing operation ids and admits at most one
/// operation scope at a time.
#[derive(Debug, Default)]
pub struct OperationSequencer {
    next_sequence_id: AtomicU64,
    current: Mutex<Option<NavigationOperation>>,
}

impl OperationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(&self, name: &'static str) -> NavigationOperation {
        NavigationOperation {
            name,
            sequence_id: self.next_sequence_id.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Returns `None` when another operation scope is still open.
    pub fn try_begin(&self, operation: NavigationOperation) -> Option<OperationScope<'_>> {
        let mut current = lock(&self.current);
        if current.is_some() {
            return None;
        }
        *current = Some(operation.clone());
        Some(OperationScope {
            sequencer: self,
            operation,
        })
    }

    pub fn current(&self) -> Option<NavigationOperation> {
        lock(&self.current).clone()
    }
}

/// Open operation scope; closing happens on drop.
#[derive(Debug)]
pub struct OperationScope<'a> {
    sequencer: &'a OperationSequencer,
    operation: NavigationOperation,
}

impl OperationScope<'_> {
    pub fn operation(&self) -> &NavigationOperation {
        &self.operation
    }
}

impl Drop for OperationScope<'_> {
    fn drop(&mut self) {
        *lock(&self.sequencer.current) = None;
    }
}
