use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::NavResult;
use crate::page::{TransitionInfo, ViewModel};
use crate::stack::{
    NavigateRequest, StackNavigator, StackReportSink, StackState, StackStateChanged,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    Section,
    Modal { priority: i32 },
}

/// A stack navigator with an identity inside a coordinator.
pub struct SectionNavigator {
    name: String,
    role: SlotRole,
    closing_transition: Option<TransitionInfo>,
    stack: StackNavigator,
}

impl SectionNavigator {
    pub fn section(stack: StackNavigator) -> Self {
        Self {
            name: stack.name().to_string(),
            role: SlotRole::Section,
            closing_transition: None,
            stack,
        }
    }

    pub fn modal(
        stack: StackNavigator,
        priority: i32,
        closing_transition: Option<TransitionInfo>,
    ) -> Self {
        Self {
            name: stack.name().to_string(),
            role: SlotRole::Modal { priority },
            closing_transition,
            stack,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> SlotRole {
        self.role
    }

    pub fn is_modal(&self) -> bool {
        matches!(self.role, SlotRole::Modal { .. })
    }

    pub fn priority(&self) -> Option<i32> {
        match self.role {
            SlotRole::Modal { priority } => Some(priority),
            SlotRole::Section => None,
        }
    }

    pub fn closing_transition(&self) -> Option<&TransitionInfo> {
        self.closing_transition.as_ref()
    }

    pub fn stack(&self) -> &StackNavigator {
        &self.stack
    }

    pub fn state(&self) -> Arc<StackState> {
        self.stack.state()
    }

    pub fn subscribe(&self) -> flume::Receiver<StackStateChanged> {
        self.stack.subscribe()
    }

    pub async fn navigate(
        &self,
        cancel: &CancellationToken,
        request: NavigateRequest,
    ) -> NavResult<Option<Arc<dyn ViewModel>>> {
        self.stack.navigate(cancel, request).await
    }

    pub async fn navigate_back(
        &self,
        cancel: &CancellationToken,
    ) -> NavResult<Option<Arc<dyn ViewModel>>> {
        self.stack.navigate_back(cancel).await
    }

    pub async fn remove_entries(
        &self,
        cancel: &CancellationToken,
        indexes: Vec<usize>,
    ) -> NavResult<()> {
        self.stack.remove_entries(cancel, indexes).await
    }

    pub async fn clear(&self, cancel: &CancellationToken) -> NavResult<()> {
        self.stack.clear(cancel).await
    }

    pub(crate) fn attach(&self, sink: Arc<dyn StackReportSink>) {
        self.stack.attach_reporter(sink);
    }

    /// Stops reporting to the coordinator. Later changes, including the
    /// final clear of a closing modal, stay local to this stack.
    pub(crate) fn dispose(&self) {
        self.stack.detach_reporter();
    }
}

impl fmt::Display for SectionNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            SlotRole::Section => write!(f, "section {}", self.stack),
            SlotRole::Modal { priority } => write!(f, "modal {} at priority {priority}", self.stack),
        }
    }
}

impl fmt::Debug for SectionNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionNavigator")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
