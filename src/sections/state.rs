use std::sync::Arc;

use crate::error::{NavError, NavResult};
use crate::gate::{RequestStatus, Snapshot};
use crate::page::PageKind;
use crate::stack::StackState;

use super::request::{CloseModalRequest, SectionsRequest};
use super::section::SectionNavigator;

/// A section or modal together with its stack snapshot at the time the
/// enclosing [`SectionsState`] was produced.
#[derive(Debug, Clone)]
pub struct StackSlot {
    navigator: Arc<SectionNavigator>,
    state: Arc<StackState>,
}

impl StackSlot {
    pub(crate) fn capture(navigator: Arc<SectionNavigator>) -> Self {
        let state = navigator.state();
        Self { navigator, state }
    }

    pub(crate) fn with_state(navigator: Arc<SectionNavigator>, state: Arc<StackState>) -> Self {
        Self { navigator, state }
    }

    pub fn navigator(&self) -> &Arc<SectionNavigator> {
        &self.navigator
    }

    pub fn state(&self) -> &Arc<StackState> {
        &self.state
    }

    pub fn name(&self) -> &str {
        self.navigator.name()
    }

    pub fn priority(&self) -> Option<i32> {
        self.navigator.priority()
    }

    pub fn top_kind(&self) -> Option<&PageKind> {
        self.state.active_kind()
    }

    pub(crate) fn holds(&self, navigator: &SectionNavigator) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.navigator), navigator)
    }
}

/// Immutable snapshot of a sections coordinator.
///
/// Modals are kept sorted by ascending priority; the last one is active and
/// masks the active section.
#[derive(Debug, Clone)]
pub struct SectionsState {
    pub(crate) sections: Vec<StackSlot>,
    pub(crate) active_section: Option<String>,
    pub(crate) modals: Vec<StackSlot>,
    pub(crate) last_request: Option<SectionsRequest>,
    pub(crate) last_request_status: RequestStatus,
}

impl SectionsState {
    pub(crate) fn new(sections: Vec<StackSlot>) -> Self {
        Self {
            sections,
            active_section: None,
            modals: Vec::new(),
            last_request: None,
            last_request_status: RequestStatus::Processed,
        }
    }

    pub(crate) fn with_status(&self, status: RequestStatus, request: SectionsRequest) -> Self {
        Self {
            last_request: Some(request),
            last_request_status: status,
            ..self.clone()
        }
    }

    pub fn sections(&self) -> &[StackSlot] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&StackSlot> {
        self.sections.iter().find(|slot| slot.name() == name)
    }

    pub fn active_section_name(&self) -> Option<&str> {
        self.active_section.as_deref()
    }

    pub fn active_section(&self) -> Option<&StackSlot> {
        self.section(self.active_section.as_deref()?)
    }

    pub fn modals(&self) -> &[StackSlot] {
        &self.modals
    }

    pub fn modal(&self, name: &str) -> Option<&StackSlot> {
        self.modals.iter().find(|slot| slot.name() == name)
    }

    pub fn active_modal(&self) -> Option<&StackSlot> {
        self.modals.last()
    }

    /// Modal a close request targets: by name, else the top-most one at the
    /// requested priority, else the top-most modal.
    pub fn modal_to_close(&self, request: &CloseModalRequest) -> NavResult<&StackSlot> {
        if self.modals.is_empty() {
            return Err(NavError::not_found("there are no modals to close"));
        }
        if let Some(name) = &request.name {
            return self
                .modal(name)
                .ok_or_else(|| NavError::not_found(format!("no modal named '{name}'")));
        }
        let found = match request.priority {
            Some(priority) => self
                .modals
                .iter()
                .rev()
                .find(|slot| slot.priority() == Some(priority)),
            None => self.active_modal(),
        };
        found.ok_or_else(|| NavError::not_found("no modal at the requested priority"))
    }

    /// The active modal, else the active section.
    pub fn active_slot(&self) -> Option<&StackSlot> {
        self.active_modal().or_else(|| self.active_section())
    }

    pub fn active_stack(&self) -> Option<&Arc<SectionNavigator>> {
        self.active_slot().map(StackSlot::navigator)
    }

    pub fn active_page_kind(&self) -> Option<&PageKind> {
        self.active_slot()?.top_kind()
    }

    pub fn has_active_view_model(&self) -> bool {
        self.active_modal().is_some_and(|slot| !slot.state.is_empty())
            || self.active_section().is_some_and(|slot| !slot.state.is_empty())
    }

    /// Slot of the stack that produced the pending report, if the last
    /// request is a report.
    pub fn report_origin(&self) -> Option<&StackSlot> {
        let Some(SectionsRequest::Report(report)) = &self.last_request else {
            return None;
        };
        if report.is_modal {
            self.modal(&report.origin)
        } else {
            self.section(&report.origin)
        }
    }

    /// Whether the stack behind the last report is the one users see. A
    /// section is never active while a modal is open.
    pub fn is_report_origin_active(&self) -> bool {
        let Some(origin) = self.report_origin() else {
            return false;
        };
        if origin.navigator.is_modal() {
            self.active_modal()
                .is_some_and(|top| Arc::ptr_eq(&top.navigator, &origin.navigator))
        } else {
            self.modals.is_empty()
                && self
                    .active_section()
                    .is_some_and(|active| Arc::ptr_eq(&active.navigator, &origin.navigator))
        }
    }

    pub fn last_request(&self) -> Option<&SectionsRequest> {
        self.last_request.as_ref()
    }

    pub fn last_request_status(&self) -> RequestStatus {
        self.last_request_status
    }
}

impl Snapshot for SectionsState {
    fn request_status(&self) -> RequestStatus {
        self.last_request_status
    }
}
