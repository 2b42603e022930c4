// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `ocrs` recognition backend.
//
// Plugs the pure-Rust `ocrs` engine (neural network models executed via
// `rten`) into the `EngineFactory` / `RecognitionEngine` seam used by the
// engine manager.
//
// # Feature Gate
//
// Only available with the `ocr` feature:
//
// ```toml
// kassenbon-document = { path = "crates/kassenbon-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// Two model files are required:
//
// - **Detection model** (`text-detection.rten`) — locates text regions.
// - **Recognition model** (`text-recognition.rten`) — decodes characters.
//
// Running `ocrs-cli` once downloads both to `$XDG_CACHE_HOME/ocrs`
// (typically `~/.cache/ocrs`), which is the default lookup directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kassenbon_core::error::{KassenbonError, Result};
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use super::engine::{EngineFactory, RecognitionEngine};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the two model files.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects `text-detection.rten` and `text-recognition.rten` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Use `model_dir` when set, the default cache directory otherwise.
    pub fn from_optional_dir(model_dir: Option<&Path>) -> Self {
        model_dir.map(Self::from_dir).unwrap_or_default()
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(KassenbonError::EngineInit(format!(
                    "model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Builds [`OcrsRecognizer`]s from model files on disk.
#[derive(Debug, Clone, Default)]
pub struct OcrsEngineFactory {
    config: OcrConfig,
}

impl OcrsEngineFactory {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for OcrsEngineFactory {
    #[instrument(skip_all, fields(
        detection = %self.config.detection_model_path.display(),
        recognition = %self.config.recognition_model_path.display(),
    ))]
    fn create(&self) -> Result<Arc<dyn RecognitionEngine>> {
        self.config.validate()?;

        info!("Loading OCR detection model");
        let detection_model = load_model(&self.config.detection_model_path)?;
        info!("Loading OCR recognition model");
        let recognition_model = load_model(&self.config.recognition_model_path)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| KassenbonError::EngineInit(format!("failed to build OCR engine: {err}")))?;

        info!("OCR engine initialised");
        Ok(Arc::new(OcrsRecognizer { engine }))
    }
}

fn load_model(path: &Path) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        KassenbonError::EngineInit(format!("failed to load model {}: {err}", path.display()))
    })
}

/// A loaded `ocrs` engine.
pub struct OcrsRecognizer {
    engine: OcrsEngine,
}

impl RecognitionEngine for OcrsRecognizer {
    /// Detect words, group them into lines and decode each line. Progress is
    /// reported after each stage.
    #[instrument(skip_all, fields(image_len = image.len()))]
    fn recognize(&self, image: &[u8], progress: &dyn Fn(f32)) -> Result<String> {
        let decoded = image::load_from_memory(image)
            .map_err(|err| KassenbonError::Recognition(format!("undecodable image: {err}")))?;
        let rgb = decoded.to_rgb8();
        drop(decoded);
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            KassenbonError::Recognition(format!(
                "failed to create image source ({width}x{height}): {err}"
            ))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| KassenbonError::Recognition(format!("OCR preprocessing failed: {err}")))?;
        progress(0.1);

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| KassenbonError::Recognition(format!("word detection failed: {err}")))?;
        debug!(word_count = word_rects.len(), "Words detected");
        progress(0.45);

        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        debug!(line_count = line_rects.len(), "Text lines found");
        progress(0.55);

        let lines = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| KassenbonError::Recognition(format!("line recognition failed: {err}")))?;
        progress(1.0);

        let text = lines
            .iter()
            .flatten()
            .map(|line| line.to_string())
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        debug!(char_count = text.len(), "OCR recognition complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_well_known_filenames() {
        let config = OcrConfig::default();
        assert!(
            config
                .detection_model_path
                .to_string_lossy()
                .ends_with(DETECTION_MODEL_FILENAME)
        );
        assert!(
            config
                .recognition_model_path
                .to_string_lossy()
                .ends_with(RECOGNITION_MODEL_FILENAME)
        );
    }

    #[test]
    fn optional_dir_overrides_default() {
        let config = OcrConfig::from_optional_dir(Some(Path::new("/opt/receipt-models")));
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/opt/receipt-models/text-detection.rten")
        );
    }

    #[test]
    fn missing_models_fail_as_engine_init() {
        let factory = OcrsEngineFactory::new(OcrConfig::from_dir("/nonexistent/ocr-models"));
        let err = factory.create().err().expect("models are missing");
        assert!(matches!(err, KassenbonError::EngineInit(_)));
    }
}
