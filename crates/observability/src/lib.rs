//! Process-wide tracing setup shared by the server and the client tools.

pub mod tracing;

pub use crate::tracing::{init, init_for_tests, LogFormat};
