//! Tracing initialisation helpers for tests.
//!
//! Call [`init_test_tracing`] at the top of any test that emits tracing events
//! and wants them captured by the test harness.
//!
//! The subscriber is initialised at most once per process, so it is safe to
//! call from every test function. To assert on emitted warnings, use
//! [`capture_diagnostics`] instead.

use searchgrid_core::{DiagnosticCollector, DiagnosticReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialise a tracing subscriber that writes to the test-harness writer
/// and respects the `RUST_LOG` environment variable.
///
/// # Example
///
/// ```ignore
/// #[test]
/// fn my_test() {
///     searchgrid_test_utils::tracing_setup::init_test_tracing();
///     tracing::info!("visible when RUST_LOG=info");
/// }
/// ```
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Install a thread-local subscriber that captures warnings and errors.
///
/// Events are captured until the returned guard is dropped.
pub fn capture_diagnostics() -> (DiagnosticReader, tracing::subscriber::DefaultGuard) {
    let collector = DiagnosticCollector::new(256);
    let reader = collector.reader();
    let guard = tracing_subscriber::registry().with(collector).set_default();
    (reader, guard)
}
