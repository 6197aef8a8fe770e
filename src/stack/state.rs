use std::fmt;
use std::sync::Arc;

use crate::gate::{RequestStatus, Snapshot};
use crate::page::{PageKind, ViewHandle, ViewModel};

use super::request::{NavigateRequest, StackRequest};

/// One page of a stack: the request that created it, its view-model and the
/// view handle returned by the provisioner.
#[derive(Clone)]
pub struct NavigationEntry {
    request: NavigateRequest,
    view_model: Arc<dyn ViewModel>,
    view: ViewHandle,
}

impl NavigationEntry {
    pub(crate) fn new(
        request: NavigateRequest,
        view_model: Arc<dyn ViewModel>,
        view: ViewHandle,
    ) -> Self {
        Self {
            request,
            view_model,
            view,
        }
    }

    pub fn request(&self) -> &NavigateRequest {
        &self.request
    }

    pub fn kind(&self) -> &PageKind {
        self.request.kind()
    }

    pub fn view_model(&self) -> &Arc<dyn ViewModel> {
        &self.view_model
    }

    pub fn view(&self) -> &ViewHandle {
        &self.view
    }
}

impl fmt::Debug for NavigationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationEntry")
            .field("kind", self.kind())
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

/// Immutable snapshot of a stack navigator.
#[derive(Debug, Clone)]
pub struct StackState {
    entries: Arc<Vec<NavigationEntry>>,
    last_request: Option<StackRequest>,
    last_request_status: RequestStatus,
}

impl StackState {
    pub fn empty() -> Self {
        Self {
            entries: Arc::new(Vec::new()),
            last_request: None,
            last_request_status: RequestStatus::Processed,
        }
    }

    pub(crate) fn new(
        entries: Arc<Vec<NavigationEntry>>,
        last_request_status: RequestStatus,
        last_request: StackRequest,
    ) -> Self {
        Self {
            entries,
            last_request: Some(last_request),
            last_request_status,
        }
    }

    /// Same entries, new request bookkeeping.
    pub(crate) fn with_status(&self, status: RequestStatus, request: StackRequest) -> Self {
        Self::new(Arc::clone(&self.entries), status, request)
    }

    /// Entries, oldest first; the last one is active.
    pub fn stack(&self) -> &[NavigationEntry] {
        &self.entries
    }

    pub(crate) fn entries(&self) -> &Arc<Vec<NavigationEntry>> {
        &self.entries
    }

    /// True when both snapshots hold the very same entry list.
    pub fn shares_stack_with(&self, other: &StackState) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active_entry(&self) -> Option<&NavigationEntry> {
        self.entries.last()
    }

    pub fn active_kind(&self) -> Option<&PageKind> {
        self.active_entry().map(NavigationEntry::kind)
    }

    pub fn last_request(&self) -> Option<&StackRequest> {
        self.last_request.as_ref()
    }

    pub fn last_request_status(&self) -> RequestStatus {
        self.last_request_status
    }
}

impl Default for StackState {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot for StackState {
    fn request_status(&self) -> RequestStatus {
        self.last_request_status
    }
}
