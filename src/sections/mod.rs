mod coordinator;
mod factory;
mod ops;
mod predict;
mod request;
mod section;
mod sequenced;
mod state;

#[cfg(test)]
mod tests;

pub use coordinator::{SectionsCoordinator, SectionsStateChanged};
pub use factory::{SharedStackFactory, StackFactory};
pub use predict::predict_next_page;
pub use request::{
    CloseModalRequest, OpenModalRequest, SectionsRequest, SetActiveSectionRequest, StackReport,
};
pub use section::{SectionNavigator, SlotRole};
pub use sequenced::SequencedCoordinator;
pub use state::{SectionsState, StackSlot};
