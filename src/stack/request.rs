use std::fmt;
use std::sync::Arc;

use crate::error::NavResult;
use crate::page::{PageKind, ViewModel};

pub type ViewModelFactory = Arc<dyn Fn() -> NavResult<Arc<dyn ViewModel>> + Send + Sync>;

/// Forward navigation to a new page.
///
/// The view-model is built by `factory` only once the request is accepted; the
/// page kind is known up front.
#[derive(Clone)]
pub struct NavigateRequest {
    kind: PageKind,
    factory: ViewModelFactory,
    pub suppress_transition: bool,
    pub clear_back_stack: bool,
}

impl NavigateRequest {
    pub fn new<T, F>(factory: F) -> Self
    where
        T: ViewModel,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::dynamic(PageKind::of::<T>(), move || {
            let view_model: Arc<dyn ViewModel> = Arc::new(factory());
            Ok(view_model)
        })
    }

    /// Like [`new`](Self::new) for factories that can fail.
    pub fn try_new<T, F>(factory: F) -> Self
    where
        T: ViewModel,
        F: Fn() -> NavResult<T> + Send + Sync + 'static,
    {
        Self::dynamic(PageKind::of::<T>(), move || {
            let view_model: Arc<dyn ViewModel> = Arc::new(factory()?);
            Ok(view_model)
        })
    }

    pub fn dynamic<F>(kind: PageKind, factory: F) -> Self
    where
        F: Fn() -> NavResult<Arc<dyn ViewModel>> + Send + Sync + 'static,
    {
        Self {
            kind,
            factory: Arc::new(factory),
            suppress_transition: false,
            clear_back_stack: false,
        }
    }

    pub fn suppress_transition(mut self) -> Self {
        self.suppress_transition = true;
        self
    }

    pub fn clear_back_stack(mut self) -> Self {
        self.clear_back_stack = true;
        self
    }

    pub fn kind(&self) -> &PageKind {
        &self.kind
    }

    pub(crate) fn instantiate(&self) -> NavResult<Arc<dyn ViewModel>> {
        (self.factory)()
    }
}

impl fmt::Debug for NavigateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigateRequest")
            .field("kind", &self.kind)
            .field("suppress_transition", &self.suppress_transition)
            .field("clear_back_stack", &self.clear_back_stack)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum StackRequest {
    Navigate(NavigateRequest),
    NavigateBack,
    /// Indexes refer to the stack as it was before the removal.
    RemoveEntries(Vec<usize>),
    Clear,
}

impl StackRequest {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate(_) => "navigate",
            Self::NavigateBack => "navigate-back",
            Self::RemoveEntries(_) => "remove-entries",
            Self::Clear => "clear",
        }
    }
}

impl fmt::Display for StackRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate(request) => {
                write!(f, "navigate({})", request.kind())?;
                if request.clear_back_stack {
                    f.write_str(" clearing back stack")?;
                }
                Ok(())
            }
            Self::RemoveEntries(indexes) => write!(f, "remove-entries({indexes:?})"),
            other => f.write_str(other.as_str()),
        }
    }
}
