// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kassenbon-document — Receipt images and the recognition engine.
//
// Provides the image preprocessor (validation, downscaling, grayscale and
// contrast enhancement) and the lifecycle manager for the shared, expensive
// recognition engine, plus an `ocrs`-backed engine behind the `ocr` feature.

pub mod image;
pub mod scan;

pub use self::image::preprocess::ImagePreprocessor;
pub use scan::engine::{EngineFactory, EngineHandle, EngineManager, EngineState, RecognitionEngine};

#[cfg(feature = "ocr")]
pub use scan::ocr::{OcrConfig, OcrsEngineFactory};
