use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::NavigationConfig;
use crate::error::{NavError, NavResult};
use crate::event::{Broadcaster, StateChanged};
use crate::gate::{Admission, RequestStatus, SnapshotCell};
use crate::page::{BlindProvisioner, BlindTransitions, Surface, TransitionExecutor};
use crate::stack::{StackNavigator, StackReportSink, StackStateChanged};

use super::factory::{SharedStackFactory, StackFactory};
use super::request::{
    CloseModalRequest, OpenModalRequest, SectionsRequest, SetActiveSectionRequest, StackReport,
};
use super::section::SectionNavigator;
use super::state::{SectionsState, StackSlot};

pub type SectionsStateChanged = StateChanged<SectionsState>;

/// Structural change committed by a finished coordinator request. Applied to
/// the latest snapshot, so reports that landed meanwhile are kept.
enum Change {
    InsertModal(StackSlot),
    RemoveModal(Arc<SectionNavigator>),
    ActivateSection(String),
}

impl Change {
    fn inserted_modal(&self) -> Option<Arc<SectionNavigator>> {
        match self {
            Self::InsertModal(slot) => Some(Arc::clone(slot.navigator())),
            _ => None,
        }
    }
}

struct CoordinatorCore {
    cell: SnapshotCell<SectionsState>,
    events: Broadcaster<SectionsStateChanged>,
    factory: Arc<dyn StackFactory>,
    transitions: Arc<dyn TransitionExecutor>,
    config: Arc<NavigationConfig>,
}

impl CoordinatorCore {
    fn publish(&self, change: &SectionsStateChanged) {
        self.events.publish(change);
    }

    /// Records a child transition. Reports skip the single-flight gate; they
    /// only describe something the child already did.
    fn report(&self, origin: &Arc<SectionNavigator>, change: &StackStateChanged) {
        let committed = self.cell.commit_if(
            |current| {
                let mut next = current.clone();
                let slots = if origin.is_modal() {
                    &mut next.modals
                } else {
                    &mut next.sections
                };
                let slot = slots.iter_mut().find(|slot| slot.holds(origin))?;
                *slot = StackSlot::with_state(Arc::clone(origin), Arc::clone(&change.current));

                let status = change.current.last_request_status();
                next.last_request = Some(SectionsRequest::Report(StackReport {
                    origin: origin.name().to_string(),
                    is_modal: origin.is_modal(),
                    request: change.current.last_request().cloned(),
                    status,
                }));
                next.last_request_status = status;
                Some(next)
            },
            |change| self.publish(change),
        );
        if committed.is_none() {
            debug!(stack = origin.name(), "ignoring report from a stack that is not listed");
        }
    }
}

/// Forwards a child's transitions to its coordinator.
struct ReportRelay {
    core: Weak<CoordinatorCore>,
    origin: Weak<SectionNavigator>,
}

impl StackReportSink for ReportRelay {
    fn deliver(&self, change: &StackStateChanged) {
        if let (Some(core), Some(origin)) = (self.core.upgrade(), self.origin.upgrade()) {
            core.report(&origin, change);
        }
    }
}

/// Named sections plus a priority-ordered list of modals layered above them.
///
/// The active stack is the top-most modal, else the active section. Like a
/// stack navigator, the coordinator processes one request at a time and drops
/// requests arriving while another is Processing.
#[derive(Clone)]
pub struct SectionsCoordinator {
    core: Arc<CoordinatorCore>,
}

impl SectionsCoordinator {
    /// Creates one section per name through `factory`.
    pub async fn new(
        config: Arc<NavigationConfig>,
        factory: Arc<dyn StackFactory>,
        transitions: Arc<dyn TransitionExecutor>,
        section_names: &[&str],
    ) -> NavResult<Self> {
        let mut stacks = Vec::with_capacity(section_names.len());
        for name in section_names {
            stacks.push(factory.create_stack_navigator(name, None, None).await?);
        }
        Self::from_stacks(config, factory, transitions, stacks)
    }

    pub fn from_stacks(
        config: Arc<NavigationConfig>,
        factory: Arc<dyn StackFactory>,
        transitions: Arc<dyn TransitionExecutor>,
        stacks: Vec<StackNavigator>,
    ) -> NavResult<Self> {
        let mut names = HashSet::new();
        for stack in &stacks {
            if !names.insert(stack.name().to_string()) {
                return Err(NavError::conflict(format!(
                    "section '{}' is defined twice",
                    stack.name()
                )));
            }
        }

        let sections: Vec<Arc<SectionNavigator>> = stacks
            .into_iter()
            .map(|stack| Arc::new(SectionNavigator::section(stack)))
            .collect();
        let slots = sections.iter().cloned().map(StackSlot::capture).collect();
        let coordinator = Self {
            core: Arc::new(CoordinatorCore {
                cell: SnapshotCell::new(SectionsState::new(slots)),
                events: Broadcaster::new(),
                factory,
                transitions,
                config,
            }),
        };
        for section in &sections {
            section.attach(coordinator.relay(section));
        }
        Ok(coordinator)
    }

    /// Coordinator whose stacks create no views and play no transitions.
    pub fn blind(config: Arc<NavigationConfig>, section_names: &[&str]) -> NavResult<Self> {
        let stacks = section_names
            .iter()
            .map(|name| {
                StackNavigator::new(
                    *name,
                    Arc::new(BlindProvisioner),
                    Arc::new(BlindTransitions),
                    Arc::clone(&config),
                )
            })
            .collect();
        let factory = Arc::new(SharedStackFactory::blind(Arc::clone(&config)));
        Self::from_stacks(config, factory, Arc::new(BlindTransitions), stacks)
    }

    pub fn state(&self) -> Arc<SectionsState> {
        self.core.cell.load()
    }

    pub fn subscribe(&self) -> flume::Receiver<SectionsStateChanged> {
        self.core.events.subscribe()
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.core.config
    }

    pub fn section(&self, name: &str) -> Option<Arc<SectionNavigator>> {
        self.state().section(name).map(|slot| Arc::clone(slot.navigator()))
    }

    /// Creates a modal, runs its first navigation and inserts it by priority.
    /// Returns the new modal.
    pub async fn open_modal(
        &self,
        cancel: &CancellationToken,
        request: OpenModalRequest,
    ) -> NavResult<Option<Arc<SectionNavigator>>> {
        let sections_request = SectionsRequest::OpenModal(request.clone());
        self.run(cancel, sections_request, |_| Ok(true), move |processing| {
            self.open(processing, request)
        })
        .await
    }

    /// Closes the named modal, else the top-most one at the given priority,
    /// else the top-most modal.
    pub async fn close_modal(
        &self,
        cancel: &CancellationToken,
        request: CloseModalRequest,
    ) -> NavResult<()> {
        let sections_request = SectionsRequest::CloseModal(request.clone());
        self.run(cancel, sections_request, |_| Ok(true), move |processing| {
            self.close(processing, request)
        })
        .await
        .map(|_| ())
    }

    /// Returns `None` without any notification when the section is already
    /// active.
    pub async fn set_active_section(
        &self,
        cancel: &CancellationToken,
        request: SetActiveSectionRequest,
    ) -> NavResult<Option<Arc<SectionNavigator>>> {
        let sections_request = SectionsRequest::SetActiveSection(request.clone());
        let name = request.name.clone();
        self.run(
            cancel,
            sections_request,
            |current| Ok(current.active_section_name() != Some(name.as_str())),
            move |processing| self.activate(processing, request),
        )
        .await
    }

    async fn run<T, V, B, Fut>(
        &self,
        cancel: &CancellationToken,
        request: SectionsRequest,
        admit: V,
        body: B,
    ) -> NavResult<Option<T>>
    where
        V: FnOnce(&SectionsState) -> NavResult<bool>,
        B: FnOnce(Arc<SectionsState>) -> Fut,
        Fut: Future<Output = NavResult<(Change, T)>>,
    {
        let operation = request.as_str();
        debug!(%request, "starting");
        if cancel.is_cancelled() {
            warn!(operation, "canceled before start");
            return Ok(None);
        }

        let started = request.clone();
        let admission = self.core.cell.try_begin(
            |current| {
                if !admit(current)? {
                    return Ok(None);
                }
                Ok(Some(current.with_status(RequestStatus::Processing, started)))
            },
            |change| self.core.publish(change),
        )?;
        let processing = match admission {
            Admission::Accepted(processing) => processing,
            Admission::Busy => {
                warn!(operation, "another request is being processed, dropping this one");
                return Ok(None);
            }
            Admission::Declined => {
                warn!(%request, "nothing to do, dropping request");
                return Ok(None);
            }
        };

        match body(processing).await {
            Ok((change, output)) => {
                let inserted = change.inserted_modal();
                let mut rejected = None;
                self.core.cell.commit(
                    |current| match check(current, &change) {
                        Ok(()) => apply(current, change, request),
                        Err(err) => {
                            rejected = Some(err);
                            current.with_status(RequestStatus::FailedToProcess, request)
                        }
                    },
                    |change| self.core.publish(change),
                );
                if let Some(err) = rejected {
                    warn!(operation, error = %err, "failed to process");
                    if let Some(modal) = inserted {
                        discard(&modal).await;
                    }
                    return Err(err);
                }
                info!(operation, "processed");
                Ok(Some(output))
            }
            Err(err) => {
                self.core.cell.commit(
                    |current| current.with_status(RequestStatus::FailedToProcess, request),
                    |change| self.core.publish(change),
                );
                warn!(operation, error = %err, "failed to process");
                Err(err)
            }
        }
    }

    async fn open(
        &self,
        processing: Arc<SectionsState>,
        request: OpenModalRequest,
    ) -> NavResult<(Change, Arc<SectionNavigator>)> {
        let priority = match request.priority {
            Some(priority) => priority,
            None => match processing.modals().last().and_then(StackSlot::priority) {
                Some(top) => top.saturating_add(1),
                None => self.core.config.first_modal_priority,
            },
        };
        let name = request
            .name
            .clone()
            .unwrap_or_else(|| self.core.config.modal_name(priority));

        if processing.modals().iter().any(|slot| slot.priority() == Some(priority)) {
            return Err(NavError::conflict(format!(
                "a modal with priority {priority} is already open"
            )));
        }
        if processing.modal(&name).is_some() || processing.section(&name).is_some() {
            return Err(NavError::conflict(format!("the name '{name}' is already taken")));
        }

        let stack = self
            .core
            .factory
            .create_stack_navigator(&name, Some(priority), request.transition.clone())
            .await?;
        let modal = Arc::new(SectionNavigator::modal(
            stack,
            priority,
            request.closing_transition.clone(),
        ));
        modal.attach(self.relay(&modal));

        if let Err(err) = self.present(&processing, &modal, priority, &request).await {
            discard(&modal).await;
            return Err(err);
        }
        info!(modal = %name, priority, "modal opened");
        Ok((Change::InsertModal(StackSlot::capture(Arc::clone(&modal))), modal))
    }

    async fn present(
        &self,
        processing: &SectionsState,
        modal: &SectionNavigator,
        priority: i32,
        request: &OpenModalRequest,
    ) -> NavResult<()> {
        // Reports from this navigation are ignored until the modal is listed.
        modal
            .navigate(&CancellationToken::new(), request.navigate.clone())
            .await?;

        let is_top = processing
            .modals()
            .iter()
            .all(|slot| slot.priority().is_some_and(|existing| existing < priority));
        let surface = Surface::top_of(modal.name(), &modal.state());
        if is_top {
            let from = live_surface(processing.active_slot());
            self.core
                .transitions
                .run_transition(request.transition.as_ref(), &from, &surface, true)
                .await
        } else {
            self.core.transitions.prepare_background(&surface).await
        }
    }

    async fn close(
        &self,
        processing: Arc<SectionsState>,
        request: CloseModalRequest,
    ) -> NavResult<(Change, ())> {
        let target = Arc::clone(processing.modal_to_close(&request)?.navigator());
        let is_top = processing
            .active_modal()
            .is_some_and(|top| Arc::ptr_eq(top.navigator(), &target));

        if is_top {
            let modals = processing.modals();
            let revealed = match modals {
                [.., below, _] => Some(below),
                _ => processing.active_section(),
            };
            let from = Surface::top_of(target.name(), &target.state());
            let to = live_surface(revealed);
            let transition = request
                .transition
                .as_ref()
                .or_else(|| target.closing_transition());
            self.core
                .transitions
                .run_transition(transition, &from, &to, false)
                .await?;
        }

        // Detach first so the clear below is not reported.
        target.dispose();
        target.clear(&CancellationToken::new()).await?;
        info!(modal = target.name(), "modal closed");
        Ok((Change::RemoveModal(target), ()))
    }

    async fn activate(
        &self,
        processing: Arc<SectionsState>,
        request: SetActiveSectionRequest,
    ) -> NavResult<(Change, Arc<SectionNavigator>)> {
        let next = processing.section(&request.name).ok_or_else(|| {
            NavError::not_found(format!("no section named '{}'", request.name))
        })?;

        // The first activation is instantaneous.
        if let Some(previous) = processing.active_section() {
            let from = live_surface(Some(previous));
            let to = live_surface(Some(next));
            self.core
                .transitions
                .run_transition(request.transition.as_ref(), &from, &to, true)
                .await?;
        }
        Ok((
            Change::ActivateSection(request.name.clone()),
            Arc::clone(next.navigator()),
        ))
    }

    fn relay(&self, origin: &Arc<SectionNavigator>) -> Arc<dyn StackReportSink> {
        Arc::new(ReportRelay {
            core: Arc::downgrade(&self.core),
            origin: Arc::downgrade(origin),
        })
    }
}

impl fmt::Debug for SectionsCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("SectionsCoordinator")
            .field("active_section", &state.active_section_name())
            .field("modals", &state.modals().len())
            .field("status", &state.last_request_status())
            .finish()
    }
}

/// Modal names and priorities are unique in the snapshot a change lands on,
/// not only in the one it was planned against.
fn check(current: &SectionsState, change: &Change) -> NavResult<()> {
    let Change::InsertModal(slot) = change else {
        return Ok(());
    };
    if current.modals().iter().any(|modal| modal.priority() == slot.priority()) {
        return Err(NavError::conflict(format!(
            "a modal with priority {} is already open",
            slot.priority().unwrap_or_default()
        )));
    }
    if current.modal(slot.name()).is_some() || current.section(slot.name()).is_some() {
        return Err(NavError::conflict(format!(
            "the name '{}' is already taken",
            slot.name()
        )));
    }
    Ok(())
}

/// Detaches a modal that never made it into the list and disposes its pages.
async fn discard(modal: &SectionNavigator) {
    modal.dispose();
    if let Err(err) = modal.clear(&CancellationToken::new()).await {
        warn!(modal = modal.name(), error = %err, "failed to clear a discarded modal");
    }
}

fn apply(current: &SectionsState, change: Change, request: SectionsRequest) -> SectionsState {
    let mut next = current.with_status(RequestStatus::Processed, request);
    match change {
        Change::InsertModal(slot) => {
            next.modals.push(slot);
            next.modals.sort_by_key(StackSlot::priority);
        }
        Change::RemoveModal(modal) => next.modals.retain(|slot| !slot.holds(&modal)),
        Change::ActivateSection(name) => next.active_section = Some(name),
    }
    next
}

/// Surface showing the current top of a slot's stack.
fn live_surface(slot: Option<&StackSlot>) -> Surface {
    match slot {
        Some(slot) => Surface::top_of(slot.name(), &slot.navigator().state()),
        None => Surface::empty(),
    }
}
