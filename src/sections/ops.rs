use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{NavError, NavResult};
use crate::page::{PageKind, ViewModel, ViewModelExt};
use crate::stack::NavigateRequest;

use super::coordinator::SectionsCoordinator;
use super::request::{CloseModalRequest, OpenModalRequest, SetActiveSectionRequest};
use super::section::SectionNavigator;

impl SectionsCoordinator {
    /// The top-most modal, else the active section.
    pub fn active_stack(&self) -> Option<Arc<SectionNavigator>> {
        self.state().active_stack().cloned()
    }

    pub fn active_view_model(&self) -> Option<Arc<dyn ViewModel>> {
        self.active_stack()?.stack().active_view_model()
    }

    fn require_active_stack(&self) -> NavResult<Arc<SectionNavigator>> {
        self.active_stack()
            .ok_or_else(|| NavError::usage("no section is active and no modal is open"))
    }

    pub async fn navigate(
        &self,
        cancel: &CancellationToken,
        request: NavigateRequest,
    ) -> NavResult<Option<Arc<dyn ViewModel>>> {
        self.require_active_stack()?.navigate(cancel, request).await
    }

    pub async fn navigate_to<T, F>(
        &self,
        cancel: &CancellationToken,
        factory: F,
    ) -> NavResult<Option<Arc<T>>>
    where
        T: ViewModel,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.require_active_stack()?
            .stack()
            .navigate_to(cancel, factory)
            .await
    }

    pub async fn navigate_and_clear<T, F>(
        &self,
        cancel: &CancellationToken,
        factory: F,
    ) -> NavResult<Option<Arc<T>>>
    where
        T: ViewModel,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.require_active_stack()?
            .stack()
            .navigate_and_clear(cancel, factory)
            .await
    }

    pub async fn navigate_back(
        &self,
        cancel: &CancellationToken,
    ) -> NavResult<Option<Arc<dyn ViewModel>>> {
        self.require_active_stack()?.navigate_back(cancel).await
    }

    pub async fn remove_previous(&self, cancel: &CancellationToken) -> NavResult<()> {
        self.require_active_stack()?
            .stack()
            .remove_previous(cancel)
            .await
    }

    /// Activates `name`, first giving it a root page of type `T` when it is
    /// empty. With `return_to_root` a section showing another page is
    /// brought back to its `T` entry, or restarted on a new one.
    pub async fn set_active_section_with_root<T, F>(
        &self,
        cancel: &CancellationToken,
        name: &str,
        factory: F,
        return_to_root: bool,
    ) -> NavResult<Option<Arc<SectionNavigator>>>
    where
        T: ViewModel,
        F: Fn() -> T + Send + Sync + 'static,
    {
        if cancel.is_cancelled() {
            warn!(section = name, "canceled before start");
            return Ok(None);
        }
        let cancel = CancellationToken::new();

        let section = self
            .section(name)
            .ok_or_else(|| NavError::not_found(format!("no section named '{name}'")))?;
        let state = section.state();
        let root = PageKind::of::<T>();

        match state.active_kind() {
            None => {
                let request = NavigateRequest::new(factory).suppress_transition();
                section.navigate(&cancel, request).await?;
            }
            Some(active) if return_to_root && active != &root => {
                if state.stack().iter().any(|entry| entry.kind() == &root) {
                    let last = state.len() - 1;
                    let indexes = state
                        .stack()
                        .iter()
                        .enumerate()
                        .filter(|(index, entry)| entry.kind() != &root && *index < last)
                        .map(|(index, _)| index)
                        .collect();
                    section.remove_entries(&cancel, indexes).await?;
                    section.navigate_back(&cancel).await?;
                } else {
                    let request = NavigateRequest::new(factory)
                        .suppress_transition()
                        .clear_back_stack();
                    section.navigate(&cancel, request).await?;
                }
            }
            Some(_) => {}
        }

        self.set_active_section(&cancel, SetActiveSectionRequest::new(name))
            .await
    }

    pub async fn close_top_modal(&self, cancel: &CancellationToken) -> NavResult<()> {
        self.close_modal(cancel, CloseModalRequest::top()).await
    }

    pub fn can_navigate_back_or_close_modal(&self) -> bool {
        let state = self.state();
        !state.modals().is_empty()
            || state
                .active_section()
                .is_some_and(|section| section.state().len() > 1)
    }

    /// Navigates back in the top-most modal, closes it when it has nothing
    /// to go back to, and otherwise navigates back in the active section.
    pub async fn navigate_back_or_close_modal(&self, cancel: &CancellationToken) -> NavResult<()> {
        let state = self.state();
        if let Some(modal) = state.active_modal() {
            if modal.navigator().stack().can_navigate_back() {
                modal.navigator().navigate_back(cancel).await?;
            } else {
                self.close_modal(cancel, CloseModalRequest::top()).await?;
            }
            return Ok(());
        }
        match state.active_section() {
            Some(section) if section.navigator().stack().can_navigate_back() => {
                section.navigator().navigate_back(cancel).await?;
                Ok(())
            }
            section => Err(NavError::usage(format!(
                "section '{}' cannot navigate back and there is no modal to close",
                section.map_or("none", |section| section.name())
            ))),
        }
    }

    /// Opens a modal whose first page is `T` and returns that page.
    pub async fn open_modal_with<T, F>(
        &self,
        cancel: &CancellationToken,
        factory: F,
        priority: Option<i32>,
        name: Option<&str>,
    ) -> NavResult<Option<Arc<T>>>
    where
        T: ViewModel,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let mut request = OpenModalRequest::new(NavigateRequest::new(factory).suppress_transition());
        request.priority = priority;
        request.name = name.map(str::to_string);

        let Some(modal) = self.open_modal(cancel, request).await? else {
            return Ok(None);
        };
        Ok(modal
            .stack()
            .active_view_model()
            .and_then(|view_model| view_model.downcast::<T>()))
    }
}
