// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Kassenbon.

use thiserror::Error;

/// Top-level error type for all Kassenbon operations.
#[derive(Debug, Error)]
pub enum KassenbonError {
    // -- Input errors --
    #[error("invalid input image: {0}")]
    InvalidInput(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Recognition engine errors --
    #[error("recognition engine initialisation failed: {0}")]
    EngineInit(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),

    // -- Pipeline misuse --
    #[error("operation `{operation}` not allowed while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: String,
    },

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("expense hand-off failed: {0}")]
    Sink(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KassenbonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_phase_display_names_operation() {
        let err = KassenbonError::InvalidPhase {
            operation: "scan",
            phase: "awaiting input".into(),
        };
        assert_eq!(
            err.to_string(),
            "operation `scan` not allowed while awaiting input"
        );
    }
}
