// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{KassenbonError, Result};
use crate::types::MAX_INPUT_BYTES;

/// Persistent scanner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Largest accepted upload in bytes.
    pub max_input_bytes: usize,
    /// Images wider than this are scaled down to it.
    pub max_width: u32,
    /// Contrast gain applied around the 128 midpoint.
    pub contrast_gain: f32,
    /// JPEG quality (1-100) for the normalized image.
    pub jpeg_quality: u8,
    /// Receipts at or above this amount keep their image.
    pub retention_threshold: f64,
    /// Override for the OCR model directory.
    pub model_dir: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: MAX_INPUT_BYTES,
            max_width: 1500,
            contrast_gain: 1.3,
            jpeg_quality: 90,
            retention_threshold: 1000.0,
            model_dir: None,
        }
    }
}

impl ScanConfig {
    /// Read a JSON config file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        info!("scan config loaded");
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(path.as_ref()) {
            Err(KassenbonError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject values the preprocessor cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 {
            return Err(KassenbonError::Config("max_width must be positive".into()));
        }
        if self.max_input_bytes == 0 {
            return Err(KassenbonError::Config(
                "max_input_bytes must be positive".into(),
            ));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(KassenbonError::Config(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.contrast_gain.is_nan() || self.contrast_gain <= 0.0 {
            return Err(KassenbonError::Config(format!(
                "contrast_gain must be positive, got {}",
                self.contrast_gain
            )));
        }
        if !self.retention_threshold.is_finite() {
            return Err(KassenbonError::Config(
                "retention_threshold must be finite".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scanner_constants() {
        let config = ScanConfig::default();
        assert_eq!(config.max_input_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_width, 1500);
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.retention_threshold, 1000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        let config = ScanConfig {
            retention_threshold: 250.0,
            model_dir: Some(PathBuf::from("/opt/models")),
            ..ScanConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ScanConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        std::fs::write(&path, r#"{ "max_width": 800 }"#).unwrap();
        let config = ScanConfig::load(&path).unwrap();
        assert_eq!(config.max_width, 800);
        assert_eq!(config.jpeg_quality, 90);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScanConfig::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn zero_quality_is_rejected() {
        let config = ScanConfig {
            jpeg_quality: 0,
            ..ScanConfig::default()
        };
        assert!(matches!(config.validate(), Err(KassenbonError::Config(_))));
    }
}
