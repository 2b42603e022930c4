// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the scanner UI.
//
// Every user-visible failure collapses into one of two short messages: either
// the picked file is not usable, or the scan failed and the user can retry or
// type the expense in by hand. Internal detail never reaches the screen.

use serde::{Deserialize, Serialize};

use crate::error::KassenbonError;

/// The two messages a user can ever see from the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserMessage {
    /// The chosen file is not an image or is too large.
    InvalidInput,
    /// Recognition failed; retry or enter the expense manually.
    ScanFailed,
}

impl UserMessage {
    /// Plain English text shown to the user.
    pub fn text(&self) -> &'static str {
        match self {
            Self::InvalidInput => "Please choose an image file smaller than 10 MB.",
            Self::ScanFailed => {
                "We couldn't read this receipt. Try again, or enter the details manually."
            }
        }
    }

    /// Whether retrying the same image is worthwhile.
    pub fn retriable(&self) -> bool {
        matches!(self, Self::ScanFailed)
    }
}

impl std::fmt::Display for UserMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// Convert a `KassenbonError` into the message a user gets to see.
pub fn humanize_error(err: &KassenbonError) -> UserMessage {
    match err {
        KassenbonError::InvalidInput(_) | KassenbonError::ImageError(_) => {
            UserMessage::InvalidInput
        }
        KassenbonError::EngineInit(_)
        | KassenbonError::Recognition(_)
        | KassenbonError::InvalidPhase { .. }
        | KassenbonError::Config(_)
        | KassenbonError::Sink(_)
        | KassenbonError::Io(_)
        | KassenbonError::Serialization(_) => UserMessage::ScanFailed,
    }
}
