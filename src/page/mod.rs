mod blind;
mod kind;
mod traits;

pub use blind::{BlindProvisioner, BlindTransitions};
pub use kind::{PageKind, Surface, TransitionInfo, ViewHandle};
pub use traits::{AsAnyArc, PageProvisioner, TransitionExecutor, ViewModel, ViewModelExt};
