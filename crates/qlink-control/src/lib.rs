pub mod sender;
pub mod state;

pub use sender::send_command;
pub use state::{ControlState, InputSnapshot, TickOutcome};
