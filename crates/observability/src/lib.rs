//! `memberkit-observability` — logging setup shared by binaries and tests.

pub mod tracing;

pub use self::tracing::{init, init_for_tests, init_with, LogFormat};
