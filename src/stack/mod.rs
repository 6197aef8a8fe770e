mod navigator;
mod ops;
mod request;
mod state;

pub use navigator::{StackNavigator, StackReportSink, StackStateChanged};
pub use request::{NavigateRequest, StackRequest, ViewModelFactory};
pub use state::{NavigationEntry, StackState};
