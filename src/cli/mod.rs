/// Shared plumbing for the `shaderbuild` binary
///
/// Modules:
/// - logging: tracing subscriber setup (stderr, optional log file)
/// - progress: user-facing status lines for batch and watch mode
pub mod logging;
pub mod progress;

pub use logging::init_logging;
pub use progress::{ConsoleLine, ConsoleReporter};
