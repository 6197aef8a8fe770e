use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{NavError, NavResult};
use crate::page::{PageKind, ViewModel, ViewModelExt};

use super::navigator::StackNavigator;
use super::request::{NavigateRequest, StackRequest};

impl StackNavigator {
    pub fn can_navigate_back(&self) -> bool {
        self.state().len() > 1
    }

    pub fn active_view_model(&self) -> Option<Arc<dyn ViewModel>> {
        let state = self.state();
        state.active_entry().map(|entry| Arc::clone(entry.view_model()))
    }

    /// Dispatches a request value to the matching operation.
    pub async fn process_request(
        &self,
        cancel: &CancellationToken,
        request: StackRequest,
    ) -> NavResult<Option<Arc<dyn ViewModel>>> {
        match request {
            StackRequest::Navigate(request) => self.navigate(cancel, request).await,
            StackRequest::NavigateBack => self.navigate_back(cancel).await,
            StackRequest::RemoveEntries(indexes) => {
                self.remove_entries(cancel, indexes).await?;
                Ok(None)
            }
            StackRequest::Clear => {
                self.clear(cancel).await?;
                Ok(None)
            }
        }
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
        let view_model = self.navigate(cancel, NavigateRequest::new(factory)).await?;
        Ok(view_model.and_then(|vm| vm.downcast::<T>()))
    }

    /// Navigates to `T` and drops every entry below it.
    pub async fn navigate_and_clear<T, F>(
        &self,
        cancel: &CancellationToken,
        factory: F,
    ) -> NavResult<Option<Arc<T>>>
    where
        T: ViewModel,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let request = NavigateRequest::new(factory).clear_back_stack();
        let view_model = self.navigate(cancel, request).await?;
        Ok(view_model.and_then(|vm| vm.downcast::<T>()))
    }

    /// Removes the entry right below the active one.
    pub async fn remove_previous(&self, cancel: &CancellationToken) -> NavResult<()> {
        let len = self.state().len();
        let Some(previous) = len.checked_sub(2) else {
            return Err(NavError::usage(format!(
                "stack {} has no entry below the active one",
                self.name()
            )));
        };
        self.remove_entries(cancel, vec![previous]).await
    }

    /// Goes back to the oldest entry of `kind`, removing everything between it
    /// and the active entry first. Returns false when no entry matches.
    pub async fn try_navigate_back_to(
        &self,
        cancel: &CancellationToken,
        kind: &PageKind,
    ) -> NavResult<bool> {
        let state = self.state();
        let Some(target) = state.stack().iter().position(|entry| entry.kind() == kind) else {
            warn!(navigator = %self.name(), page = %kind, "no entry to navigate back to");
            return Ok(false);
        };
        let active = state.len() - 1;
        if target == active {
            return Ok(true);
        }

        let between: Vec<usize> = (target + 1..active).collect();
        if !between.is_empty() {
            self.remove_entries(cancel, between).await?;
        }
        self.navigate_back(cancel).await?;
        Ok(true)
    }

    pub async fn try_navigate_back_to_page<T: ViewModel>(
        &self,
        cancel: &CancellationToken,
    ) -> NavResult<bool> {
        self.try_navigate_back_to(cancel, &PageKind::of::<T>()).await
    }
}
