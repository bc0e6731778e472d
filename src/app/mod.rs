//! Process-level wiring: builds the arbiter, upload sessions and HTTP server
//! from configuration and runs them until a shutdown signal.

mod orchestrator;
mod runtime;
mod shutdown;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::FitcamOrchestrator;
pub use types::{ComponentState, ShutdownReason, SourceKind};
