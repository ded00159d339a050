//! Process-wide logging setup shared by the binaries.

/// Install the global subscriber, configured from the environment.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

pub mod tracing;
