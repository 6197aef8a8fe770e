use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use crate::stack::{NavigationEntry, StackState};

/// Identity of a view-model type, known before the view-model exists.
///
/// Requests carry their kind so the next active page can be computed while a
/// request is still Processing.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PageKind(KindRepr);

#[derive(Clone, PartialEq, Eq, Hash)]
enum KindRepr {
    Typed { id: TypeId, name: &'static str },
    Named(Arc<str>),
}

impl PageKind {
    pub fn of<T: 'static>() -> Self {
        Self(KindRepr::Typed {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        })
    }

    /// A kind without a backing Rust type, for pages described at runtime.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self(KindRepr::Named(name.into()))
    }

    pub fn is<T: 'static>(&self) -> bool {
        matches!(&self.0, KindRepr::Typed { id, .. } if *id == TypeId::of::<T>())
    }

    pub fn name(&self) -> &str {
        match &self.0 {
            KindRepr::Typed { name, .. } => name,
            KindRepr::Named(name) => name,
        }
    }

    /// Last path segment of the name.
    pub fn short_name(&self) -> &str {
        let name = self.name();
        name.rsplit("::").next().unwrap_or(name)
    }
}

impl fmt::Debug for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageKind({})", self.short_name())
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Opaque view produced by the page provisioning collaborator.
///
/// The core keeps it next to its entry and hands it back to collaborators; it
/// never looks inside.
#[derive(Clone, Default)]
pub struct ViewHandle(Option<Arc<dyn Any + Send + Sync>>);

impl ViewHandle {
    pub fn new(view: impl Any + Send + Sync) -> Self {
        Self(Some(Arc::new(view)))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("ViewHandle(..)"),
            None => f.write_str("ViewHandle(none)"),
        }
    }
}

/// Transition descriptor passed through to the transition executor untouched.
#[derive(Clone)]
pub struct TransitionInfo {
    name: Arc<str>,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl TransitionInfo {
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Any + Send + Sync) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for TransitionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionInfo")
            .field("name", &self.name)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

/// Logical surface a transition moves from or to.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    pub stack: Option<String>,
    pub page: Option<PageKind>,
    pub view: ViewHandle,
}

impl Surface {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of_entry(stack: &str, entry: &NavigationEntry) -> Self {
        Self {
            stack: Some(stack.to_string()),
            page: Some(entry.kind().clone()),
            view: entry.view().clone(),
        }
    }

    /// Surface showing the active entry of `state`, or an empty surface named
    /// after the stack.
    pub fn top_of(stack: &str, state: &StackState) -> Self {
        match state.active_entry() {
            Some(entry) => Self::of_entry(stack, entry),
            None => Self {
                stack: Some(stack.to_string()),
                ..Self::default()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_none() && self.page.is_none()
    }
}
