use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span, warn};

use crate::error::NavResult;
use crate::gate::{NavigationOperation, OperationSequencer};

use super::coordinator::{SectionsCoordinator, SectionsStateChanged};
use super::request::{CloseModalRequest, OpenModalRequest, SetActiveSectionRequest};
use super::section::SectionNavigator;
use super::state::SectionsState;

/// Runs coordinator requests inside operation scopes.
///
/// Only one operation runs at a time; a call made while another operation is
/// open is dropped and resolves to `None`. The `*_within` variants let callers
/// share one operation across several requests.
#[derive(Clone)]
pub struct SequencedCoordinator {
    coordinator: SectionsCoordinator,
    sequencer: Arc<OperationSequencer>,
}

impl SequencedCoordinator {
    pub fn new(coordinator: SectionsCoordinator) -> Self {
        Self {
            coordinator,
            sequencer: Arc::new(OperationSequencer::new()),
        }
    }

    pub fn coordinator(&self) -> &SectionsCoordinator {
        &self.coordinator
    }

    pub fn state(&self) -> Arc<SectionsState> {
        self.coordinator.state()
    }

    pub fn subscribe(&self) -> flume::Receiver<SectionsStateChanged> {
        self.coordinator.subscribe()
    }

    pub fn operation(&self, name: &'static str) -> NavigationOperation {
        self.sequencer.operation(name)
    }

    pub fn current_operation(&self) -> Option<NavigationOperation> {
        self.sequencer.current()
    }

    pub async fn open_modal(
        &self,
        cancel: &CancellationToken,
        request: OpenModalRequest,
    ) -> NavResult<Option<Arc<SectionNavigator>>> {
        let operation = self.operation("open-modal");
        self.open_modal_within(cancel, request, operation).await
    }

    pub async fn open_modal_within(
        &self,
        cancel: &CancellationToken,
        request: OpenModalRequest,
        operation: NavigationOperation,
    ) -> NavResult<Option<Arc<SectionNavigator>>> {
        let opened = self
            .within(operation, self.coordinator.open_modal(cancel, request))
            .await?;
        Ok(opened.flatten())
    }

    /// Returns whether the request ran.
    pub async fn close_modal(
        &self,
        cancel: &CancellationToken,
        request: CloseModalRequest,
    ) -> NavResult<bool> {
        let operation = self.operation("close-modal");
        self.close_modal_within(cancel, request, operation).await
    }

    pub async fn close_modal_within(
        &self,
        cancel: &CancellationToken,
        request: CloseModalRequest,
        operation: NavigationOperation,
    ) -> NavResult<bool> {
        let closed = self
            .within(operation, self.coordinator.close_modal(cancel, request))
            .await?;
        Ok(closed.is_some())
    }

    pub async fn set_active_section(
        &self,
        cancel: &CancellationToken,
        request: SetActiveSectionRequest,
    ) -> NavResult<Option<Arc<SectionNavigator>>> {
        let operation = self.operation("set-active-section");
        self.set_active_section_within(cancel, request, operation)
            .await
    }

    pub async fn set_active_section_within(
        &self,
        cancel: &CancellationToken,
        request: SetActiveSectionRequest,
        operation: NavigationOperation,
    ) -> NavResult<Option<Arc<SectionNavigator>>> {
        let activated = self
            .within(operation, self.coordinator.set_active_section(cancel, request))
            .await?;
        Ok(activated.flatten())
    }

    async fn within<T, Fut>(&self, operation: NavigationOperation, work: Fut) -> NavResult<Option<T>>
    where
        Fut: Future<Output = NavResult<T>>,
    {
        let Some(scope) = self.sequencer.try_begin(operation.clone()) else {
            warn!(%operation, "another operation is in progress, dropping this one");
            return Ok(None);
        };
        let span = info_span!(
            "navigation_operation",
            operation = scope.operation().name,
            sequence_id = scope.operation().sequence_id
        );
        let output = work.instrument(span).await;
        drop(scope);
        output.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use super::SequencedCoordinator;
    use crate::config::NavigationConfig;
    use crate::sections::{CloseModalRequest, OpenModalRequest, SectionsCoordinator};
    use crate::testing::{DisposeLog, PopupPage, page};

    fn sequenced() -> SequencedCoordinator {
        let coordinator =
            SectionsCoordinator::blind(Arc::new(NavigationConfig::default()), &["Home"]).unwrap();
        SequencedCoordinator::new(coordinator)
    }

    #[tokio::test]
    async fn requests_run_and_release_their_scope() {
        let log = DisposeLog::default();
        let sequenced = sequenced();
        let cancel = CancellationToken::new();

        let modal = sequenced
            .open_modal(&cancel, OpenModalRequest::new(page::<PopupPage>(&log)))
            .await
            .unwrap();
        assert!(modal.is_some());
        assert!(sequenced.current_operation().is_none());

        let closed = sequenced
            .close_modal(&cancel, CloseModalRequest::top())
            .await
            .unwrap();
        assert!(closed);
        assert!(sequenced.state().modals().is_empty());
    }

    #[tokio::test]
    async fn calls_are_dropped_while_an_operation_scope_is_open() {
        let log = DisposeLog::default();
        let sequenced = sequenced();
        let held = sequenced.operation("held");
        let sequencer = Arc::clone(&sequenced.sequencer);
        let scope = sequencer.try_begin(held).expect("scope should open");

        let modal = sequenced
            .open_modal(
                &CancellationToken::new(),
                OpenModalRequest::new(page::<PopupPage>(&log)),
            )
            .await
            .unwrap();

        assert!(modal.is_none());
        assert!(sequenced.state().modals().is_empty());
        drop(scope);

        let ids: Vec<u64> = (0..2).map(|_| sequenced.operation("next").sequence_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
