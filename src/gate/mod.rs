mod cell;
mod sequencer;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use cell::Snapshot;
pub(crate) use cell::{Admission, SnapshotCell};
pub use sequencer::{NavigationOperation, OperationScope, OperationSequencer};

/// Processing status of the last request a navigator accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Processing,
    Processed,
    FailedToProcess,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::FailedToProcess => "failed-to-process",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }
}

/// Every guarded section in this crate only flips flags or swaps `Arc`s, so a
/// poisoned lock still holds a consistent value.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
