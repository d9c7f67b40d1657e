//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with timestamps.
    Json,
    /// Human-readable lines routed through the test harness capture.
    Test,
}

impl LogFormat {
    fn default_directive(self) -> &'static str {
        match self {
            LogFormat::Json => "info",
            LogFormat::Test => "debug",
        }
    }
}

/// JSON logs filtered by `RUST_LOG` (default `info`). Repeated calls are no-ops.
pub fn init() {
    init_with(LogFormat::Json);
}

/// Test-harness logs filtered by `RUST_LOG` (default `debug`).
pub fn init_for_tests() {
    init_with(LogFormat::Test);
}

/// Install a global subscriber in `format` unless one is already set.
///
/// Returns `false` when another subscriber won.
pub fn init_with(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format.default_directive()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init()
            .is_ok(),
        LogFormat::Test => builder.with_test_writer().try_init().is_ok(),
    }
}
