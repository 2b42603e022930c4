// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition — the engine seam, its lifecycle manager, and the optional
// `ocrs` backend.

pub mod engine;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use engine::{EngineFactory, EngineHandle, EngineManager, EngineState, RecognitionEngine};

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrsEngineFactory};
