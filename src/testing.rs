//! Shared fixtures for unit tests: recording pages and scriptable collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::{NavError, NavResult};
use crate::gate::lock;
use crate::page::{PageProvisioner, Surface, TransitionExecutor, TransitionInfo, ViewHandle, ViewModel};
use crate::stack::NavigateRequest;

/// Names of disposed pages, in disposal order.
#[derive(Clone, Default)]
pub(crate) struct DisposeLog(Arc<Mutex<Vec<&'static str>>>);

impl DisposeLog {
    pub(crate) fn record(&self, label: &'static str) {
        lock(&self.0).push(label);
    }

    pub(crate) fn entries(&self) -> Vec<&'static str> {
        lock(&self.0).clone()
    }

    pub(crate) fn count(&self, label: &str) -> usize {
        lock(&self.0).iter().filter(|entry| **entry == label).count()
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.0).len()
    }
}

pub(crate) trait TestPage: ViewModel + Sized {
    fn create(log: DisposeLog, fail_dispose: bool) -> Self;
}

macro_rules! test_page {
    ($($name:ident),+ $(,)?) => {$(
        pub(crate) struct $name {
            log: DisposeLog,
            fail_dispose: bool,
        }

        impl TestPage for $name {
            fn create(log: DisposeLog, fail_dispose: bool) -> Self {
                Self { log, fail_dispose }
            }
        }

        impl ViewModel for $name {
            fn dispose(&self) -> NavResult<()> {
                self.log.record(stringify!($name));
                if self.fail_dispose {
                    return Err(NavError::collaborator(
                        concat!(stringify!($name), " failed to dispose"),
                        "dispose hook returned an error",
                    ));
                }
                Ok(())
            }
        }
    )+};
}

test_page!(HomePage, DetailsPage, SettingsPage, ProfilePage, PopupPage, ConfirmPage);

pub(crate) fn page<T: TestPage>(log: &DisposeLog) -> NavigateRequest {
    let log = log.clone();
    NavigateRequest::new(move || T::create(log.clone(), false))
}

pub(crate) fn failing_page<T: TestPage>(log: &DisposeLog) -> NavigateRequest {
    let log = log.clone();
    NavigateRequest::new(move || T::create(log.clone(), true))
}

/// Provisioner that parks every `create_view` call until released.
#[derive(Clone, Default)]
pub(crate) struct GatedProvisioner {
    pub(crate) entered: Arc<Notify>,
    pub(crate) release: Arc<Notify>,
}

#[async_trait]
impl PageProvisioner for GatedProvisioner {
    async fn create_view(&self, _view_model: &Arc<dyn ViewModel>) -> NavResult<ViewHandle> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(ViewHandle::none())
    }
}

/// Transition executor that parks every `run_transition` call until released.
#[derive(Clone, Default)]
pub(crate) struct GatedTransitions {
    pub(crate) entered: Arc<Notify>,
    pub(crate) release: Arc<Notify>,
}

#[async_trait]
impl TransitionExecutor for GatedTransitions {
    async fn run_transition(
        &self,
        _transition: Option<&TransitionInfo>,
        _from: &Surface,
        _to: &Surface,
        _is_forward: bool,
    ) -> NavResult<()> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

pub(crate) struct FailingProvisioner;

#[async_trait]
impl PageProvisioner for FailingProvisioner {
    async fn create_view(&self, _view_model: &Arc<dyn ViewModel>) -> NavResult<ViewHandle> {
        Err(NavError::collaborator("view creation failed", "no surface"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TransitionCall {
    pub(crate) transition: Option<String>,
    pub(crate) from: Option<String>,
    pub(crate) to: Option<String>,
    pub(crate) is_forward: bool,
}

/// Records transitions as `(from page, to page)` short names; optionally fails.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransitions {
    calls: Arc<Mutex<Vec<TransitionCall>>>,
    backgrounds: Arc<Mutex<Vec<Option<String>>>>,
    fail: bool,
}

impl RecordingTransitions {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<TransitionCall> {
        lock(&self.calls).clone()
    }

    pub(crate) fn backgrounds(&self) -> Vec<Option<String>> {
        lock(&self.backgrounds).clone()
    }
}

fn page_name(surface: &Surface) -> Option<String> {
    surface.page.as_ref().map(|kind| kind.short_name().to_string())
}

#[async_trait]
impl TransitionExecutor for RecordingTransitions {
    async fn run_transition(
        &self,
        transition: Option<&TransitionInfo>,
        from: &Surface,
        to: &Surface,
        is_forward: bool,
    ) -> NavResult<()> {
        lock(&self.calls).push(TransitionCall {
            transition: transition.map(|info| info.name().to_string()),
            from: page_name(from),
            to: page_name(to),
            is_forward,
        });
        if self.fail {
            return Err(NavError::collaborator("transition failed", "animation aborted"));
        }
        Ok(())
    }

    async fn prepare_background(&self, surface: &Surface) -> NavResult<()> {
        lock(&self.backgrounds).push(page_name(surface));
        Ok(())
    }
}
