use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::NavResult;
use crate::stack::NavigationEntry;

use super::kind::{Surface, TransitionInfo, ViewHandle};

/// Downcast support for [`ViewModel`] trait objects; implemented for every
/// `'static` type.
pub trait AsAnyArc: Any + Send + Sync {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAnyArc for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A page's view-model as seen by the navigators.
///
/// A stack entry owns its view-model until `dispose` runs, which happens once
/// when the entry leaves the stack through back navigation, removal or clear.
pub trait ViewModel: AsAnyArc {
    fn set_view(&self, view: &ViewHandle) {
        let _ = view;
    }

    fn dispose(&self) -> NavResult<()>;
}

pub trait ViewModelExt {
    fn downcast<T: ViewModel>(&self) -> Option<Arc<T>>;
}

impl ViewModelExt for Arc<dyn ViewModel> {
    fn downcast<T: ViewModel>(&self) -> Option<Arc<T>> {
        Arc::clone(self).into_any_arc().downcast::<T>().ok()
    }
}

/// Creates views for view-models. May suspend (e.g. hop to a UI thread).
#[async_trait]
pub trait PageProvisioner: Send + Sync {
    async fn create_view(&self, view_model: &Arc<dyn ViewModel>) -> NavResult<ViewHandle>;

    /// Called after entries left a stack without a transition (removal,
    /// clear, back-stack replacement).
    async fn release_views(&self, entries: &[NavigationEntry]) -> NavResult<()> {
        let _ = entries;
        Ok(())
    }
}

/// Plays transitions between two surfaces and returns once visually settled.
#[async_trait]
pub trait TransitionExecutor: Send + Sync {
    async fn run_transition(
        &self,
        transition: Option<&TransitionInfo>,
        from: &Surface,
        to: &Surface,
        is_forward: bool,
    ) -> NavResult<()>;

    /// Prepares a surface that is not yet visually on top (a modal opened
    /// below the top-most one).
    async fn prepare_background(&self, surface: &Surface) -> NavResult<()> {
        let _ = surface;
        Ok(())
    }
}
