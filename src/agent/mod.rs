pub mod history;
pub mod prompt;
pub mod runtime;
pub mod state;

pub use runtime::AgentRuntime;
pub use state::{AgentState, ControlState};
