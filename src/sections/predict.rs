use crate::error::{NavError, NavResult};
use crate::gate::RequestStatus;
use crate::page::PageKind;
use crate::stack::StackRequest;

use super::request::{CloseModalRequest, OpenModalRequest, SectionsRequest, SetActiveSectionRequest};
use super::state::{SectionsState, StackSlot};

impl SectionsState {
    /// Page kind that will be active once the pending request completes.
    ///
    /// Only meaningful while a request is Processing; `None` means no page
    /// will be active.
    pub fn next_page_kind(&self) -> NavResult<Option<PageKind>> {
        predict_next_page(self)
    }
}

pub fn predict_next_page(state: &SectionsState) -> NavResult<Option<PageKind>> {
    if state.last_request_status() != RequestStatus::Processing {
        return Err(NavError::usage(
            "the next page can only be predicted while a request is processing",
        ));
    }
    let Some(request) = state.last_request() else {
        return Err(NavError::usage("processing state without a request"));
    };

    let current = state.active_page_kind().cloned();
    Ok(match request {
        SectionsRequest::Report(_) => after_report(state, current),
        SectionsRequest::OpenModal(request) => after_open_modal(state, request, current),
        SectionsRequest::CloseModal(request) => after_close_modal(state, request, current),
        SectionsRequest::SetActiveSection(request) => {
            after_set_active_section(state, request, current)
        }
    })
}

fn after_report(state: &SectionsState, current: Option<PageKind>) -> Option<PageKind> {
    // Background stacks never change what is visible.
    if !state.is_report_origin_active() {
        return current;
    }
    let Some(origin) = state.report_origin() else {
        return current;
    };
    let stack = origin.state();
    match stack.last_request() {
        Some(StackRequest::Navigate(request)) => Some(request.kind().clone()),
        Some(StackRequest::NavigateBack) => match stack.stack() {
            [.., revealed, _] => Some(revealed.kind().clone()),
            _ => current,
        },
        Some(StackRequest::Clear) => None,
        // Removal never targets the active entry.
        Some(StackRequest::RemoveEntries(_)) | None => current,
    }
}

fn after_open_modal(
    state: &SectionsState,
    request: &OpenModalRequest,
    current: Option<PageKind>,
) -> Option<PageKind> {
    let opens_hidden = match (request.priority, state.active_modal().and_then(StackSlot::priority)) {
        (Some(requested), Some(active)) => active >= requested,
        _ => false,
    };
    if opens_hidden {
        current
    } else {
        Some(request.navigate.kind().clone())
    }
}

fn after_close_modal(
    state: &SectionsState,
    request: &CloseModalRequest,
    current: Option<PageKind>,
) -> Option<PageKind> {
    let Ok(closing) = state.modal_to_close(request) else {
        return current;
    };
    let is_active = state
        .active_modal()
        .is_some_and(|top| std::sync::Arc::ptr_eq(top.navigator(), closing.navigator()));
    if !is_active {
        return current;
    }
    let revealed = match state.modals() {
        [.., below, _] => Some(below),
        _ => state.active_section(),
    };
    revealed.and_then(StackSlot::top_kind).cloned()
}

fn after_set_active_section(
    state: &SectionsState,
    request: &SetActiveSectionRequest,
    current: Option<PageKind>,
) -> Option<PageKind> {
    if !state.modals().is_empty() {
        return current;
    }
    match state.section(&request.name) {
        Some(section) => section.top_kind().cloned(),
        // The request is about to fail.
        None => current,
    }
}
