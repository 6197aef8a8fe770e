use std::sync::Arc;

use crate::config::NavigationConfig;
use crate::page::{BlindProvisioner, PageProvisioner};
use crate::sections::{SectionsCoordinator, SectionsStateChanged, SharedStackFactory};
use crate::stack::StackNavigator;
use crate::testing::RecordingTransitions;

mod helpers;

fn blind(names: &[&str]) -> SectionsCoordinator {
    SectionsCoordinator::blind(Arc::new(NavigationConfig::default()), names)
        .expect("section names are unique")
}

/// Coordinator whose sections and modals share `provisioner` and a recording
/// transition executor.
fn recording_with(
    names: &[&str],
    provisioner: Arc<dyn PageProvisioner>,
) -> (SectionsCoordinator, RecordingTransitions) {
    let config = Arc::new(NavigationConfig::default());
    let transitions = RecordingTransitions::default();
    let stacks = names
        .iter()
        .map(|name| {
            StackNavigator::new(
                *name,
                Arc::clone(&provisioner),
                Arc::new(transitions.clone()),
                Arc::clone(&config),
            )
        })
        .collect();
    let factory = Arc::new(SharedStackFactory::new(
        provisioner,
        Arc::new(transitions.clone()),
        Arc::clone(&config),
    ));
    let coordinator =
        SectionsCoordinator::from_stacks(config, factory, Arc::new(transitions.clone()), stacks)
            .expect("section names are unique");
    (coordinator, transitions)
}

fn recording(names: &[&str]) -> (SectionsCoordinator, RecordingTransitions) {
    recording_with(names, Arc::new(BlindProvisioner))
}

fn statuses(events: &[SectionsStateChanged]) -> Vec<&'static str> {
    events
        .iter()
        .map(|event| event.current.last_request_status().as_str())
        .collect()
}

fn active_name(coordinator: &SectionsCoordinator) -> Option<String> {
    coordinator
        .state()
        .active_page_kind()
        .map(|kind| kind.short_name().to_string())
}
