// shaderbuild test infrastructure
//
// Component tests for the build pipeline. Inline #[cfg(test)] modules next to
// pure helpers cover the small stuff; everything touching the filesystem,
// processes or the async scheduler lives here.

pub mod test_utils; // FakeCompiler, mtime and script helpers

// ============================================================================
// BATCH PIPELINE - discovery, staleness, compile invocation, worker pool
// ============================================================================
pub mod batch_tests;

// ============================================================================
// WATCH MODE - debounce table, scheduler, control tasks, watcher, session
// ============================================================================
pub mod control_tests;
