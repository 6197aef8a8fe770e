use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::NavigationConfig;
use crate::error::{NavError, NavResult};
use crate::event::{Broadcaster, StateChanged};
use crate::gate::{Admission, RequestStatus, SnapshotCell, lock};
use crate::page::{
    BlindProvisioner, BlindTransitions, PageProvisioner, Surface, TransitionExecutor,
    TransitionInfo, ViewModel,
};

use super::request::{NavigateRequest, StackRequest};
use super::state::{NavigationEntry, StackState};

pub type StackStateChanged = StateChanged<StackState>;

/// Receives every transition of a stack synchronously, in commit order.
///
/// Called while the stack's snapshot is still exclusive: implementations must
/// not call back into the reporting stack.
pub trait StackReportSink: Send + Sync {
    fn deliver(&self, change: &StackStateChanged);
}

type Outcome<T> = (Arc<Vec<NavigationEntry>>, Option<T>);

/// A single back stack of pages.
///
/// At most one request is processed at a time; a request arriving while
/// another is Processing is dropped with a warning and resolves to `None`.
pub struct StackNavigator {
    name: String,
    cell: SnapshotCell<StackState>,
    events: Broadcaster<StackStateChanged>,
    upstream: Mutex<Option<Arc<dyn StackReportSink>>>,
    provisioner: Arc<dyn PageProvisioner>,
    transitions: Arc<dyn TransitionExecutor>,
    transition: Option<TransitionInfo>,
    config: Arc<NavigationConfig>,
}

impl StackNavigator {
    pub fn new(
        name: impl Into<String>,
        provisioner: Arc<dyn PageProvisioner>,
        transitions: Arc<dyn TransitionExecutor>,
        config: Arc<NavigationConfig>,
    ) -> Self {
        Self {
            name: name.into(),
            cell: SnapshotCell::new(StackState::empty()),
            events: Broadcaster::new(),
            upstream: Mutex::new(None),
            provisioner,
            transitions,
            transition: None,
            config,
        }
    }

    /// A navigator without a view layer.
    pub fn blind(name: impl Into<String>) -> Self {
        Self::new(
            name,
            Arc::new(BlindProvisioner),
            Arc::new(BlindTransitions),
            Arc::new(NavigationConfig::default()),
        )
    }

    /// Transition descriptor handed to the executor for this stack's own
    /// navigations.
    pub fn with_transition(mut self, transition: TransitionInfo) -> Self {
        self.transition = Some(transition);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> Arc<StackState> {
        self.cell.load()
    }

    pub fn subscribe(&self) -> flume::Receiver<StackStateChanged> {
        self.events.subscribe()
    }

    pub fn attach_reporter(&self, sink: Arc<dyn StackReportSink>) {
        *lock(&self.upstream) = Some(sink);
    }

    pub fn detach_reporter(&self) {
        lock(&self.upstream).take();
    }

    pub async fn navigate(
        &self,
        cancel: &CancellationToken,
        request: NavigateRequest,
    ) -> NavResult<Option<Arc<dyn ViewModel>>> {
        debug!(navigator = %self.name, page = %request.kind(), "navigate requested");
        let stack_request = StackRequest::Navigate(request.clone());
        self.run(cancel, stack_request, |_| Ok(()), move |processing| {
            self.push(processing, request)
        })
        .await
    }

    /// Pops the active entry and returns the view-model it reveals. With fewer
    /// than two entries this is a Processed no-op returning `None`.
    pub async fn navigate_back(
        &self,
        cancel: &CancellationToken,
    ) -> NavResult<Option<Arc<dyn ViewModel>>> {
        debug!(navigator = %self.name, "navigate back requested");
        self.run(cancel, StackRequest::NavigateBack, |_| Ok(()), |processing| {
            self.pop(processing)
        })
        .await
    }

    /// Removes inactive entries by their current index.
    ///
    /// Out-of-range, duplicate or active indexes are rejected before the
    /// request is accepted.
    pub async fn remove_entries(
        &self,
        cancel: &CancellationToken,
        indexes: Vec<usize>,
    ) -> NavResult<()> {
        debug!(navigator = %self.name, ?indexes, "remove entries requested");
        let request = StackRequest::RemoveEntries(indexes.clone());
        self.run(
            cancel,
            request,
            |state| check_removal(state, &indexes),
            |processing| self.remove(processing, &indexes),
        )
        .await
        .map(|_| ())
    }

    pub async fn clear(&self, cancel: &CancellationToken) -> NavResult<()> {
        debug!(navigator = %self.name, "clear requested");
        self.run(cancel, StackRequest::Clear, |_| Ok(()), |processing| {
            self.drain(processing)
        })
        .await
        .map(|_| ())
    }

    async fn run<T, V, B, Fut>(
        &self,
        cancel: &CancellationToken,
        request: StackRequest,
        validate: V,
        body: B,
    ) -> NavResult<Option<T>>
    where
        V: FnOnce(&StackState) -> NavResult<()>,
        B: FnOnce(Arc<StackState>) -> Fut,
        Fut: Future<Output = NavResult<Outcome<T>>>,
    {
        let operation = request.as_str();
        if cancel.is_cancelled() {
            warn!(navigator = %self.name, operation, "canceled before start");
            return Ok(None);
        }

        let started = request.clone();
        let admission = self.cell.try_begin(
            |current| {
                validate(current)?;
                Ok(Some(current.with_status(RequestStatus::Processing, started)))
            },
            |change| self.publish(change),
        )?;
        let processing = match admission {
            Admission::Accepted(processing) => processing,
            Admission::Busy => {
                warn!(
                    navigator = %self.name,
                    operation,
                    "another request is being processed, dropping this one"
                );
                return Ok(None);
            }
            Admission::Declined => {
                debug!(navigator = %self.name, operation, "request declined");
                return Ok(None);
            }
        };

        match body(processing).await {
            Ok((entries, output)) => {
                let committed = self.cell.commit(
                    |_| StackState::new(entries, RequestStatus::Processed, request),
                    |change| self.publish(change),
                );
                info!(navigator = %self.name, operation, entries = committed.len(), "processed");
                Ok(output)
            }
            Err(err) => {
                self.cell.commit(
                    |current| current.with_status(RequestStatus::FailedToProcess, request),
                    |change| self.publish(change),
                );
                warn!(navigator = %self.name, operation, error = %err, "failed to process");
                Err(err)
            }
        }
    }

    async fn push(
        &self,
        processing: Arc<StackState>,
        request: NavigateRequest,
    ) -> NavResult<Outcome<Arc<dyn ViewModel>>> {
        let view_model = request.instantiate()?;
        let view = self.provisioner.create_view(&view_model).await?;
        view_model.set_view(&view);
        let entry = NavigationEntry::new(request.clone(), Arc::clone(&view_model), view);

        if !request.suppress_transition && !self.config.suppress_transitions {
            let from = Surface::top_of(&self.name, &processing);
            let to = Surface::of_entry(&self.name, &entry);
            self.transitions
                .run_transition(self.transition.as_ref(), &from, &to, true)
                .await?;
        }

        let entries = if request.clear_back_stack {
            let replaced = processing.stack();
            dispose_entries(&self.name, replaced)?;
            self.provisioner.release_views(replaced).await?;
            vec![entry]
        } else {
            let mut entries = processing.stack().to_vec();
            entries.push(entry);
            entries
        };
        Ok((Arc::new(entries), Some(view_model)))
    }

    async fn pop(&self, processing: Arc<StackState>) -> NavResult<Outcome<Arc<dyn ViewModel>>> {
        let stack = processing.stack();
        let [.., revealed, leaving] = stack else {
            warn!(navigator = %self.name, entries = stack.len(), "nothing to navigate back to");
            return Ok((Arc::clone(processing.entries()), None));
        };

        // A failure below keeps the leaving entry in place even though it
        // may already be disposed.
        leaving.view_model().dispose()?;
        if !self.config.suppress_transitions {
            let from = Surface::of_entry(&self.name, leaving);
            let to = Surface::of_entry(&self.name, revealed);
            self.transitions
                .run_transition(self.transition.as_ref(), &from, &to, false)
                .await?;
        }

        let remaining = stack[..stack.len() - 1].to_vec();
        Ok((Arc::new(remaining), Some(Arc::clone(revealed.view_model()))))
    }

    async fn remove(&self, processing: Arc<StackState>, indexes: &[usize]) -> NavResult<Outcome<()>> {
        if indexes.is_empty() {
            return Ok((Arc::clone(processing.entries()), Some(())));
        }
        let mut ordered = indexes.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));

        let mut entries = processing.stack().to_vec();
        let removed: Vec<NavigationEntry> = ordered
            .into_iter()
            .map(|index| entries.remove(index))
            .collect();
        dispose_entries(&self.name, &removed)?;
        self.provisioner.release_views(&removed).await?;
        Ok((Arc::new(entries), Some(())))
    }

    async fn drain(&self, processing: Arc<StackState>) -> NavResult<Outcome<()>> {
        let stack = processing.stack();
        dispose_entries(&self.name, stack)?;
        self.provisioner.release_views(stack).await?;
        Ok((Arc::new(Vec::new()), Some(())))
    }

    fn publish(&self, change: &StackStateChanged) {
        self.events.publish(change);
        let upstream = lock(&self.upstream).clone();
        if let Some(sink) = upstream {
            sink.deliver(change);
        }
    }
}

impl fmt::Display for StackNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        write!(f, "{} ({} entries", self.name, state.len())?;
        if let Some(kind) = state.active_kind() {
            write!(f, ", active {kind}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for StackNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackNavigator")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn check_removal(state: &StackState, indexes: &[usize]) -> NavResult<()> {
    let len = state.len();
    let mut seen = BTreeSet::new();
    for &index in indexes {
        if index >= len {
            return Err(NavError::usage(format!(
                "index {index} is out of range for a stack of {len} entries"
            )));
        }
        if index + 1 == len {
            return Err(NavError::usage(format!(
                "index {index} is the active entry; navigate back instead"
            )));
        }
        if !seen.insert(index) {
            return Err(NavError::usage(format!("index {index} is listed twice")));
        }
    }
    Ok(())
}

/// Disposes every entry, then reports the first failure.
pub(crate) fn dispose_entries(stack: &str, entries: &[NavigationEntry]) -> NavResult<()> {
    let mut first_error = None;
    for entry in entries {
        if let Err(err) = entry.view_model().dispose() {
            warn!(navigator = stack, page = %entry.kind(), error = %err, "view-model failed to dispose");
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use super::StackNavigator;
    use crate::config::NavigationConfig;
    use crate::error::NavError;
    use crate::gate::RequestStatus;
    use crate::page::{BlindProvisioner, PageKind, TransitionInfo, ViewModelExt};
    use crate::testing::{
        DetailsPage, DisposeLog, FailingProvisioner, GatedProvisioner, HomePage,
        ProfilePage, RecordingTransitions, SettingsPage, failing_page, page,
    };

    fn recording(name: &str) -> (StackNavigator, RecordingTransitions) {
        let transitions = RecordingTransitions::default();
        let navigator = StackNavigator::new(
            name,
            Arc::new(BlindProvisioner),
            Arc::new(transitions.clone()),
            Arc::new(NavigationConfig::default()),
        );
        (navigator, transitions)
    }

    fn kinds(navigator: &StackNavigator) -> Vec<String> {
        navigator
            .state()
            .stack()
            .iter()
            .map(|entry| entry.kind().short_name().to_string())
            .collect()
    }

    async fn filled(log: &DisposeLog) -> StackNavigator {
        let navigator = StackNavigator::blind("main");
        let cancel = CancellationToken::new();
        navigator.navigate(&cancel, page::<HomePage>(log)).await.unwrap();
        navigator.navigate(&cancel, page::<DetailsPage>(log)).await.unwrap();
        navigator.navigate(&cancel, page::<SettingsPage>(log)).await.unwrap();
        navigator.navigate(&cancel, page::<ProfilePage>(log)).await.unwrap();
        navigator
    }

    #[tokio::test]
    async fn navigate_pushes_and_emits_processing_then_processed() {
        let log = DisposeLog::default();
        let navigator = StackNavigator::blind("main");
        let events = navigator.subscribe();

        let view_model = navigator
            .navigate(&CancellationToken::new(), page::<HomePage>(&log))
            .await
            .unwrap()
            .expect("request should be accepted");

        assert!(view_model.downcast::<HomePage>().is_some());
        let received: Vec<_> = events.drain().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].current.last_request_status(), RequestStatus::Processing);
        assert!(received[0].current.is_empty());
        assert_eq!(received[1].current.last_request_status(), RequestStatus::Processed);
        assert_eq!(received[1].current.active_kind(), Some(&PageKind::of::<HomePage>()));
        assert!(Arc::ptr_eq(&received[0].current, &received[1].previous));
    }

    #[tokio::test]
    async fn navigate_runs_a_forward_transition_from_the_previous_top() {
        let log = DisposeLog::default();
        let (navigator, transitions) = recording("main");
        let navigator = navigator.with_transition(TransitionInfo::named("slide"));
        let cancel = CancellationToken::new();

        navigator.navigate(&cancel, page::<HomePage>(&log)).await.unwrap();
        navigator
            .navigate(&cancel, page::<DetailsPage>(&log).suppress_transition())
            .await
            .unwrap();
        navigator.navigate(&cancel, page::<SettingsPage>(&log)).await.unwrap();

        let calls = transitions.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].from, None);
        assert_eq!(calls[0].to.as_deref(), Some("HomePage"));
        assert_eq!(calls[1].from.as_deref(), Some("DetailsPage"));
        assert_eq!(calls[1].to.as_deref(), Some("SettingsPage"));
        assert_eq!(calls[1].transition.as_deref(), Some("slide"));
        assert!(calls[1].is_forward);
    }

    #[tokio::test]
    async fn navigate_back_disposes_exactly_the_popped_page() {
        let log = DisposeLog::default();
        let (navigator, transitions) = recording("main");
        let cancel = CancellationToken::new();
        navigator.navigate(&cancel, page::<HomePage>(&log)).await.unwrap();
        navigator.navigate(&cancel, page::<DetailsPage>(&log)).await.unwrap();

        let revealed = navigator.navigate_back(&cancel).await.unwrap();

        assert!(revealed.and_then(|vm| vm.downcast::<HomePage>()).is_some());
        assert_eq!(log.entries(), vec!["DetailsPage"]);
        assert_eq!(kinds(&navigator), vec!["HomePage"]);
        let last = transitions.calls().pop().expect("a back transition should run");
        assert!(!last.is_forward);
        assert_eq!(last.from.as_deref(), Some("DetailsPage"));
    }

    #[tokio::test]
    async fn navigate_back_on_a_single_entry_keeps_the_same_stack() {
        let log = DisposeLog::default();
        let navigator = StackNavigator::blind("main");
        let cancel = CancellationToken::new();
        navigator.navigate(&cancel, page::<HomePage>(&log)).await.unwrap();
        let before = navigator.state();

        let revealed = navigator.navigate_back(&cancel).await.unwrap();

        assert!(revealed.is_none());
        let after = navigator.state();
        assert!(after.shares_stack_with(&before));
        assert_eq!(after.last_request_status(), RequestStatus::Processed);
        assert_eq!(log.len(), 0);
    }

    #[tokio::test]
    async fn clear_back_stack_replaces_and_disposes_previous_entries() {
        let log = DisposeLog::default();
        let navigator = StackNavigator::blind("main");
        let cancel = CancellationToken::new();
        navigator.navigate(&cancel, page::<HomePage>(&log)).await.unwrap();
        navigator.navigate(&cancel, page::<DetailsPage>(&log)).await.unwrap();

        navigator
            .navigate(&cancel, page::<SettingsPage>(&log).clear_back_stack())
            .await
            .unwrap();

        assert_eq!(kinds(&navigator), vec!["SettingsPage"]);
        assert_eq!(log.entries(), vec!["HomePage", "DetailsPage"]);
    }

    #[tokio::test]
    async fn remove_entries_refers_to_pre_removal_indexes() {
        let log = DisposeLog::default();
        let navigator = filled(&log).await;

        navigator
            .remove_entries(&CancellationToken::new(), vec![1, 2])
            .await
            .unwrap();

        assert_eq!(kinds(&navigator), vec!["HomePage", "ProfilePage"]);
        assert_eq!(log.count("DetailsPage"), 1);
        assert_eq!(log.count("SettingsPage"), 1);
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn malformed_removals_are_rejected_without_events() {
        let log = DisposeLog::default();
        let navigator = filled(&log).await;
        let events = navigator.subscribe();
        let cancel = CancellationToken::new();

        for indexes in [vec![4], vec![3], vec![1, 1]] {
            let result = navigator.remove_entries(&cancel, indexes).await;
            assert!(matches!(result, Err(NavError::Usage(_))));
        }

        assert!(events.drain().next().is_none());
        assert_eq!(navigator.state().last_request_status(), RequestStatus::Processed);
        assert_eq!(log.len(), 0);
    }

    #[tokio::test]
    async fn clear_disposes_every_entry_even_after_a_failure() {
        let log = DisposeLog::default();
        let navigator = StackNavigator::blind("main");
        let cancel = CancellationToken::new();
        navigator.navigate(&cancel, failing_page::<HomePage>(&log)).await.unwrap();
        navigator.navigate(&cancel, page::<DetailsPage>(&log)).await.unwrap();
        let before = navigator.state();

        let result = navigator.clear(&cancel).await;

        assert!(matches!(result, Err(NavError::Collaborator { .. })));
        assert_eq!(log.entries(), vec!["HomePage", "DetailsPage"]);
        let after = navigator.state();
        assert_eq!(after.last_request_status(), RequestStatus::FailedToProcess);
        assert!(after.shares_stack_with(&before));
    }

    #[tokio::test]
    async fn provisioning_failure_rolls_back_and_propagates() {
        let log = DisposeLog::default();
        let navigator = StackNavigator::new(
            "main",
            Arc::new(FailingProvisioner),
            Arc::new(RecordingTransitions::default()),
            Arc::new(NavigationConfig::default()),
        );
        let events = navigator.subscribe();

        let result = navigator
            .navigate(&CancellationToken::new(), page::<HomePage>(&log))
            .await;

        assert!(matches!(result, Err(NavError::Collaborator { .. })));
        let received: Vec<_> = events.drain().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].current.last_request_status(), RequestStatus::FailedToProcess);
        assert!(received[1].current.is_empty());
    }

    #[tokio::test]
    async fn failed_back_transition_leaves_the_disposed_entry_in_place() {
        let log = DisposeLog::default();
        let navigator = StackNavigator::new(
            "main",
            Arc::new(BlindProvisioner),
            Arc::new(RecordingTransitions::failing()),
            Arc::new(NavigationConfig::default()),
        );
        let cancel = CancellationToken::new();
        navigator
            .navigate(&cancel, page::<HomePage>(&log).suppress_transition())
            .await
            .unwrap();
        navigator
            .navigate(&cancel, page::<DetailsPage>(&log).suppress_transition())
            .await
            .unwrap();

        let result = navigator.navigate_back(&cancel).await;

        assert!(result.is_err());
        assert_eq!(kinds(&navigator), vec!["HomePage", "DetailsPage"]);
        assert_eq!(log.entries(), vec!["DetailsPage"]);
        assert_eq!(navigator.state().last_request_status(), RequestStatus::FailedToProcess);
    }

    #[tokio::test]
    async fn failed_back_dispose_keeps_the_entry_and_propagates() {
        let log = DisposeLog::default();
        let navigator = StackNavigator::blind("main");
        let cancel = CancellationToken::new();
        navigator.navigate(&cancel, page::<HomePage>(&log)).await.unwrap();
        navigator.navigate(&cancel, failing_page::<DetailsPage>(&log)).await.unwrap();
        let before = navigator.state();
        let events = navigator.subscribe();

        let result = navigator.navigate_back(&cancel).await;

        assert!(matches!(result, Err(NavError::Collaborator { .. })));
        assert_eq!(kinds(&navigator), vec!["HomePage", "DetailsPage"]);
        assert!(navigator.state().shares_stack_with(&before));
        assert_eq!(log.entries(), vec!["DetailsPage"]);
        let statuses: Vec<_> = events
            .drain()
            .map(|event| event.current.last_request_status())
            .collect();
        assert_eq!(
            statuses,
            vec![RequestStatus::Processing, RequestStatus::FailedToProcess]
        );
    }

    #[tokio::test]
    async fn failed_removal_dispose_keeps_every_entry() {
        let log = DisposeLog::default();
        let navigator = StackNavigator::blind("main");
        let cancel = CancellationToken::new();
        navigator.navigate(&cancel, failing_page::<DetailsPage>(&log)).await.unwrap();
        navigator.navigate(&cancel, page::<HomePage>(&log)).await.unwrap();
        let before = navigator.state();
        let events = navigator.subscribe();

        let result = navigator.remove_entries(&cancel, vec![0]).await;

        assert!(matches!(result, Err(NavError::Collaborator { .. })));
        assert_eq!(kinds(&navigator), vec!["DetailsPage", "HomePage"]);
        assert!(navigator.state().shares_stack_with(&before));
        assert_eq!(log.count("DetailsPage"), 1);
        assert_eq!(log.count("HomePage"), 0);
        let statuses: Vec<_> = events
            .drain()
            .map(|event| event.current.last_request_status())
            .collect();
        assert_eq!(
            statuses,
            vec![RequestStatus::Processing, RequestStatus::FailedToProcess]
        );
    }

    #[tokio::test]
    async fn cancelled_token_prevents_the_request() {
        let log = DisposeLog::default();
        let navigator = StackNavigator::blind("main");
        let events = navigator.subscribe();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = navigator.navigate(&cancel, page::<HomePage>(&log)).await.unwrap();

        assert!(result.is_none());
        assert!(events.drain().next().is_none());
    }

    #[tokio::test]
    async fn concurrent_request_is_dropped_while_processing() {
        let log = DisposeLog::default();
        let provisioner = GatedProvisioner::default();
        let navigator = Arc::new(StackNavigator::new(
            "main",
            Arc::new(provisioner.clone()),
            Arc::new(RecordingTransitions::default()),
            Arc::new(NavigationConfig::default()),
        ));

        let first = {
            let navigator = Arc::clone(&navigator);
            let request = page::<HomePage>(&log);
            tokio::spawn(async move {
                navigator.navigate(&CancellationToken::new(), request).await
            })
        };
        provisioner.entered.notified().await;

        let second = navigator
            .navigate(&CancellationToken::new(), page::<DetailsPage>(&log))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(navigator.state().last_request_status(), RequestStatus::Processing);

        provisioner.release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(first.is_some());
        assert_eq!(kinds(&navigator), vec!["HomePage"]);
    }
}
