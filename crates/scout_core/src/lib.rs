//! Scout core: run data model and the pure run-progress state machine.
mod effect;
mod model;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use model::{ExperienceLevel, RequestError, ResultRow, RunId, RunRequest, RESULT_COLUMNS};
pub use msg::{Msg, Observation};
pub use state::{RunLimits, RunState, RunStatus};
pub use update::update;
pub use view_model::RunViewModel;
