//! Error taxonomy for the engine's fallible operations.
//!
//! Stepping the simulation is infallible (bad input there is "no move", not
//! an error). Loading content and snapshots is fallible, and those two
//! outcomes are the only `Result`-returning variants below -- input-range
//! clipping and ring overflow are documented, observable non-error outcomes
//! (see SPEC_FULL.md §7), not `EngineError` variants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to compile pack {pack}{}: {reason}", path.as_ref().map(|p| format!(" ({p})")).unwrap_or_default())]
    CompileError {
        pack: String,
        path: Option<String>,
        reason: String,
    },

    #[error("snapshot length mismatch: expected {expected} cells, got {got}")]
    SnapshotMismatch { expected: usize, got: usize },
}

impl EngineError {
    pub fn compile(pack: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::CompileError {
            pack: pack.into(),
            path: None,
            reason: reason.into(),
        }
    }

    pub fn compile_at(pack: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::CompileError {
            pack: pack.into(),
            path: Some(path.into()),
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
