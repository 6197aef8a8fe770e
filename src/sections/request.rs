use std::fmt;

use crate::gate::RequestStatus;
use crate::page::TransitionInfo;
use crate::stack::{NavigateRequest, StackRequest};

#[derive(Debug, Clone)]
pub struct OpenModalRequest {
    /// First page of the new modal.
    pub navigate: NavigateRequest,
    pub priority: Option<i32>,
    pub name: Option<String>,
    pub transition: Option<TransitionInfo>,
    /// Stored on the modal; used when it is later closed without a transition.
    pub closing_transition: Option<TransitionInfo>,
}

impl OpenModalRequest {
    pub fn new(navigate: NavigateRequest) -> Self {
        Self {
            navigate,
            priority: None,
            name: None,
            transition: None,
            closing_transition: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transition(mut self, transition: TransitionInfo) -> Self {
        self.transition = Some(transition);
        self
    }

    pub fn with_closing_transition(mut self, transition: TransitionInfo) -> Self {
        self.closing_transition = Some(transition);
        self
    }
}

/// Without a name or priority the top-most modal is closed.
#[derive(Debug, Clone, Default)]
pub struct CloseModalRequest {
    pub name: Option<String>,
    pub priority: Option<i32>,
    pub transition: Option<TransitionInfo>,
}

impl CloseModalRequest {
    pub fn top() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn at_priority(priority: i32) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn with_transition(mut self, transition: TransitionInfo) -> Self {
        self.transition = Some(transition);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SetActiveSectionRequest {
    pub name: String,
    pub transition: Option<TransitionInfo>,
}

impl SetActiveSectionRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transition: None,
        }
    }

    pub fn with_transition(mut self, transition: TransitionInfo) -> Self {
        self.transition = Some(transition);
        self
    }
}

/// A child stack changed state; `origin` names the section or modal.
#[derive(Debug, Clone)]
pub struct StackReport {
    pub origin: String,
    pub is_modal: bool,
    pub request: Option<StackRequest>,
    pub status: RequestStatus,
}

#[derive(Debug, Clone)]
pub enum SectionsRequest {
    OpenModal(OpenModalRequest),
    CloseModal(CloseModalRequest),
    SetActiveSection(SetActiveSectionRequest),
    Report(StackReport),
}

impl SectionsRequest {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenModal(_) => "open-modal",
            Self::CloseModal(_) => "close-modal",
            Self::SetActiveSection(_) => "set-active-section",
            Self::Report(_) => "report",
        }
    }
}

impl fmt::Display for SectionsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenModal(request) => {
                write!(f, "open-modal({}", request.navigate.kind())?;
                if let Some(name) = &request.name {
                    write!(f, ", name {name}")?;
                }
                if let Some(priority) = request.priority {
                    write!(f, ", priority {priority}")?;
                }
                f.write_str(")")
            }
            Self::CloseModal(request) => match (&request.name, request.priority) {
                (Some(name), _) => write!(f, "close-modal({name})"),
                (None, Some(priority)) => write!(f, "close-modal(priority {priority})"),
                (None, None) => f.write_str("close-modal(top)"),
            },
            Self::SetActiveSection(request) => write!(f, "set-active-section({})", request.name),
            Self::Report(report) => match &report.request {
                Some(request) => write!(f, "report({}: {request})", report.origin),
                None => write!(f, "report({})", report.origin),
            },
        }
    }
}
