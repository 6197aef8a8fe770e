//! Scripted navigation sessions.
//!
//! A script names the sections of a blind coordinator and lists the steps to
//! replay against it. Every coordinator transition a step causes becomes one
//! [`ScriptLine`].

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::NavigationConfig;
use crate::error::{NavError, NavResult};
use crate::gate::RequestStatus;
use crate::page::{PageKind, ViewModel};
use crate::sections::{
    CloseModalRequest, OpenModalRequest, SectionsCoordinator, SectionsState, SectionsStateChanged,
    SetActiveSectionRequest,
};
use crate::stack::NavigateRequest;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Script {
    pub sections: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    SetActiveSection {
        section: String,
    },
    Navigate {
        page: String,
    },
    NavigateAndClear {
        page: String,
    },
    NavigateBack,
    RemovePrevious,
    Clear,
    OpenModal {
        page: String,
        #[serde(default)]
        priority: Option<i32>,
        #[serde(default)]
        name: Option<String>,
    },
    CloseModal {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        priority: Option<i32>,
    },
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetActiveSection { .. } => "set-active-section",
            Self::Navigate { .. } => "navigate",
            Self::NavigateAndClear { .. } => "navigate-and-clear",
            Self::NavigateBack => "navigate-back",
            Self::RemovePrevious => "remove-previous",
            Self::Clear => "clear",
            Self::OpenModal { .. } => "open-modal",
            Self::CloseModal { .. } => "close-modal",
        }
    }
}

impl Script {
    pub fn load(path: impl AsRef<Path>) -> NavResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| {
            NavError::io_with_context(source, format!("failed to read script: {}", path.display()))
        })?;
        Self::parse(&raw).map_err(|err| match err {
            NavError::InvalidArgument(message) => {
                NavError::invalid_argument(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(raw: &str) -> NavResult<Self> {
        let script = toml::from_str::<Self>(raw)
            .map_err(|source| NavError::invalid_argument(format!("malformed script: {source}")))?;
        if script.sections.is_empty() {
            return Err(NavError::invalid_argument("a script needs at least one section"));
        }
        if let Some(blank) = script.sections.iter().find(|name| name.trim().is_empty()) {
            return Err(NavError::invalid_argument(format!(
                "section names cannot be blank: '{blank}'"
            )));
        }
        Ok(script)
    }

    /// Replays every step against a fresh blind coordinator.
    ///
    /// A failing step is recorded on its last line and the run goes on; only
    /// building the coordinator can fail the whole run.
    pub async fn run(&self, config: Arc<NavigationConfig>) -> NavResult<Vec<ScriptLine>> {
        let names: Vec<&str> = self.sections.iter().map(String::as_str).collect();
        let coordinator = SectionsCoordinator::blind(config, &names)?;
        let events = coordinator.subscribe();
        let cancel = CancellationToken::new();

        let mut lines = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            let number = index + 1;
            debug!(step = number, action = step.as_str(), "running script step");
            let result = run_step(&coordinator, &cancel, step).await;

            let mut produced: Vec<ScriptLine> = events
                .drain()
                .map(|event| ScriptLine::from_event(number, step, &event))
                .collect();
            if produced.is_empty() {
                produced.push(ScriptLine::unchanged(number, step, &coordinator.state()));
            }
            if let Err(err) = result
                && let Some(last) = produced.last_mut()
            {
                last.error = Some(err.to_string());
            }
            lines.extend(produced);
        }
        info!(steps = self.steps.len(), lines = lines.len(), "script finished");
        Ok(lines)
    }
}

async fn run_step(
    coordinator: &SectionsCoordinator,
    cancel: &CancellationToken,
    step: &Step,
) -> NavResult<()> {
    match step {
        Step::SetActiveSection { section } => {
            coordinator
                .set_active_section(cancel, SetActiveSectionRequest::new(section.as_str()))
                .await?;
        }
        Step::Navigate { page } => {
            coordinator.navigate(cancel, script_page(page)).await?;
        }
        Step::NavigateAndClear { page } => {
            coordinator
                .navigate(cancel, script_page(page).clear_back_stack())
                .await?;
        }
        Step::NavigateBack => {
            coordinator.navigate_back(cancel).await?;
        }
        Step::RemovePrevious => coordinator.remove_previous(cancel).await?,
        Step::Clear => {
            let stack = coordinator
                .active_stack()
                .ok_or_else(|| NavError::usage("nothing to clear: no active stack"))?;
            stack.clear(cancel).await?;
        }
        Step::OpenModal {
            page,
            priority,
            name,
        } => {
            let mut request = OpenModalRequest::new(script_page(page));
            request.priority = *priority;
            request.name = name.clone();
            coordinator.open_modal(cancel, request).await?;
        }
        Step::CloseModal { name, priority } => {
            let request = match (name, priority) {
                (Some(name), _) => CloseModalRequest::named(name.as_str()),
                (None, Some(priority)) => CloseModalRequest::at_priority(*priority),
                (None, None) => CloseModalRequest::top(),
            };
            coordinator.close_modal(cancel, request).await?;
        }
    }
    Ok(())
}

/// View-model for pages a script names at runtime.
#[derive(Debug)]
pub struct ScriptPage {
    name: Arc<str>,
}

impl ScriptPage {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ViewModel for ScriptPage {
    fn dispose(&self) -> NavResult<()> {
        debug!(page = %self.name, "disposed");
        Ok(())
    }
}

fn script_page(page: &str) -> NavigateRequest {
    let name: Arc<str> = Arc::from(page);
    NavigateRequest::dynamic(PageKind::named(Arc::clone(&name)), move || {
        let view_model: Arc<dyn ViewModel> = Arc::new(ScriptPage {
            name: Arc::clone(&name),
        });
        Ok(view_model)
    })
}

/// One coordinator transition observed while replaying a step.
///
/// `status` is `None` when the step left the coordinator untouched (dropped,
/// declined, or rejected before it was accepted).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScriptLine {
    pub step: usize,
    pub action: &'static str,
    pub status: Option<RequestStatus>,
    pub request: Option<String>,
    pub active_section: Option<String>,
    pub modals: Vec<String>,
    pub active_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScriptLine {
    fn from_event(step: usize, action: &Step, event: &SectionsStateChanged) -> Self {
        let state = &event.current;
        let predicted_page = match state.last_request_status() {
            RequestStatus::Processing => state
                .next_page_kind()
                .ok()
                .flatten()
                .map(|kind| kind.short_name().to_string()),
            _ => None,
        };
        Self {
            status: Some(state.last_request_status()),
            request: state.last_request().map(ToString::to_string),
            predicted_page,
            ..Self::snapshot(step, action, state)
        }
    }

    fn unchanged(step: usize, action: &Step, state: &SectionsState) -> Self {
        Self::snapshot(step, action, state)
    }

    fn snapshot(step: usize, action: &Step, state: &SectionsState) -> Self {
        Self {
            step,
            action: action.as_str(),
            status: None,
            request: None,
            active_section: state.active_section_name().map(str::to_string),
            modals: state.modals().iter().map(|slot| slot.name().to_string()).collect(),
            active_page: state.active_page_kind().map(|kind| kind.short_name().to_string()),
            predicted_page: None,
            error: None,
        }
    }

    pub fn to_json(&self) -> NavResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for ScriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status.map_or("unchanged", RequestStatus::as_str);
        write!(f, "{:>3} {:<18} {:<17}", self.step, self.action, status)?;
        if let Some(request) = &self.request {
            write!(f, " {request}")?;
        }
        write!(
            f,
            " | section={} modals=[{}] page={}",
            self.active_section.as_deref().unwrap_or("-"),
            self.modals.join(", "),
            self.active_page.as_deref().unwrap_or("-"),
        )?;
        if let Some(predicted) = &self.predicted_page {
            write!(f, " next={predicted}")?;
        }
        if let Some(error) = &self.error {
            write!(f, " error: {error}")?;
        }
        Ok(())
    }
}
