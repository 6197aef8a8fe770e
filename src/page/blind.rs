use std::sync::Arc;

use async_trait::async_trait;

use crate::error::NavResult;

use super::kind::{Surface, TransitionInfo, ViewHandle};
use super::traits::{PageProvisioner, TransitionExecutor, ViewModel};

/// Provisioner that creates no views at all. Navigation state still behaves
/// exactly as with a real view layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlindProvisioner;

#[async_trait]
impl PageProvisioner for BlindProvisioner {
    async fn create_view(&self, _view_model: &Arc<dyn ViewModel>) -> NavResult<ViewHandle> {
        Ok(ViewHandle::none())
    }
}

/// Transition executor that settles immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlindTransitions;

#[async_trait]
impl TransitionExecutor for BlindTransitions {
    async fn run_transition(
        &self,
        _transition: Option<&TransitionInfo>,
        _from: &Surface,
        _to: &Surface,
        _is_forward: bool,
    ) -> NavResult<()> {
        Ok(())
    }
}
