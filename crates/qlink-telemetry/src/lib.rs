pub mod receiver;
pub mod store;

pub use receiver::run_receiver;
pub use store::{TelemetrySnapshot, TelemetryStore};
