#![allow(clippy::collapsible_if)]
#![deny(dead_code)]

//! Syntax-aware surgical code-editing engine.
//!
//! Validates and applies changes to a single function/method body across
//! many languages, keeping enough state (cache, symbol index, rollback
//! stack) to do it atomically and undo it. See `SPEC_FULL.md` and
//! `DESIGN.md` for the module-by-module rationale; [`EditOrchestrator`] is
//! the public façade (C9) callers construct and hold.

pub mod cache;
pub mod config;
pub mod deadline;
pub mod diff_preview;
pub mod differ;
pub mod embedding;
pub mod error;
pub mod filesystem;
pub mod kinds;
pub mod languages;
pub mod leases;
pub mod node_ext;
pub mod orchestrator;
pub mod parser;
pub mod position;
pub mod rollback;
pub mod symbols;
pub mod validator;

pub use config::{EngineConfig, EngineConfigPatch};
pub use error::{AstError, EditFallback, ErrorKind, Result};
pub use orchestrator::{EditOrchestrator, EditSuccess};

/// Idempotent grammar-runtime warmup (façade `initialize()`, spec §4.9).
/// Every grammar is statically linked, so there's no dynamic loading to
/// perform; this exists to give callers a stable, explicit place to pay the
/// one-time cost of building a [`languages::LanguageRegistry`] before the
/// first real request, and to match the spec's idempotent-initialize shape.
/// Also brings up `env_logger` if nothing has claimed the global logger yet
/// — safe to call more than once, and a no-op for a caller who already set
/// up their own subscriber.
pub fn initialize() -> languages::LanguageRegistry {
    let _ = env_logger::try_init();
    languages::LanguageRegistry::new()
}

#[cfg(test)]
mod tests {
    #[test]
    fn initialize_is_idempotent() {
        let _ = super::initialize();
        let _ = super::initialize();
    }
}
