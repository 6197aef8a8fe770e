use std::sync::Arc;

use async_trait::async_trait;

use crate::config::NavigationConfig;
use crate::error::NavResult;
use crate::page::{
    BlindProvisioner, BlindTransitions, PageProvisioner, TransitionExecutor, TransitionInfo,
};
use crate::stack::StackNavigator;

/// Creates the stack behind a new section or modal.
///
/// Sections are created with no priority.
#[async_trait]
pub trait StackFactory: Send + Sync {
    async fn create_stack_navigator(
        &self,
        name: &str,
        priority: Option<i32>,
        transition: Option<TransitionInfo>,
    ) -> NavResult<StackNavigator>;
}

/// Builds every stack on the same provisioner and transition executor.
pub struct SharedStackFactory {
    provisioner: Arc<dyn PageProvisioner>,
    transitions: Arc<dyn TransitionExecutor>,
    config: Arc<NavigationConfig>,
}

impl SharedStackFactory {
    pub fn new(
        provisioner: Arc<dyn PageProvisioner>,
        transitions: Arc<dyn TransitionExecutor>,
        config: Arc<NavigationConfig>,
    ) -> Self {
        Self {
            provisioner,
            transitions,
            config,
        }
    }

    /// Stacks without a view layer.
    pub fn blind(config: Arc<NavigationConfig>) -> Self {
        Self::new(Arc::new(BlindProvisioner), Arc::new(BlindTransitions), config)
    }
}

#[async_trait]
impl StackFactory for SharedStackFactory {
    async fn create_stack_navigator(
        &self,
        name: &str,
        _priority: Option<i32>,
        transition: Option<TransitionInfo>,
    ) -> NavResult<StackNavigator> {
        let navigator = StackNavigator::new(
            name,
            Arc::clone(&self.provisioner),
            Arc::clone(&self.transitions),
            Arc::clone(&self.config),
        );
        Ok(match transition {
            Some(transition) => navigator.with_transition(transition),
            None => navigator,
        })
    }
}
