// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Kassenbon receipt scanner.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::display::DisplayHandle;

/// Largest accepted upload, in bytes (10 MiB).
pub const MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// An image as picked or photographed by the user, before validation.
#[derive(Debug, Clone)]
pub struct RawImageInput {
    bytes: Vec<u8>,
    media_type: String,
    byte_len: usize,
}

impl RawImageInput {
    /// Wrap raw bytes with their declared media type (e.g. `image/jpeg`).
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        let byte_len = bytes.len();
        Self {
            bytes,
            media_type: media_type.into(),
            byte_len,
        }
    }

    /// Infer the media type from a file extension.
    pub fn from_extension(bytes: Vec<u8>, ext: &str) -> Self {
        Self::new(bytes, media_type_for_extension(ext))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Whether the declared media type names an image.
    pub fn is_image(&self) -> bool {
        self.media_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

/// MIME type for a file extension; `application/octet-stream` when unknown.
pub fn media_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// A validated, resized, grayscale and contrast-enhanced receipt image.
///
/// Owns the display handle for its preview; dropping the image releases it.
#[derive(Debug)]
pub struct NormalizedImage {
    /// JPEG-encoded pixels.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub display: DisplayHandle,
}

impl NormalizedImage {
    /// Split into encoded bytes and display handle.
    pub fn into_parts(self) -> (Vec<u8>, DisplayHandle) {
        (self.bytes, self.display)
    }
}

/// Phase of the scanner session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanPhase {
    /// No image chosen yet.
    AwaitingInput,
    /// A normalized image is shown; scanning can start.
    Previewing,
    /// Engine acquisition and recognition are running.
    Processing,
    /// Extraction finished; the user confirms or edits the record.
    Reviewing,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::AwaitingInput => "awaiting input",
            Self::Previewing => "previewing",
            Self::Processing => "processing",
            Self::Reviewing => "reviewing",
        })
    }
}

/// One progress notification for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0..=100, non-decreasing within a session.
    pub percent: u8,
    pub status: String,
}

impl ProgressEvent {
    pub fn new(percent: u8, status: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            status: status.into(),
        }
    }
}

/// Best-effort structured guess extracted from recognized receipt text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Merchant name; empty when nothing qualified.
    pub merchant: String,
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    /// Category label; empty when no keyword matched.
    pub category: String,
}

impl ExtractedRecord {
    /// True when no field could be extracted.
    pub fn is_empty(&self) -> bool {
        self.merchant.is_empty()
            && self.amount.is_none()
            && self.date.is_none()
            && self.category.is_empty()
    }
}

/// The receipt image attached to a high-value expense.
#[derive(Debug, Serialize)]
pub struct ReceiptImage {
    pub image_bytes: Vec<u8>,
    pub display_handle: DisplayHandle,
}

/// Record handed to the expense-persistence collaborator.
#[derive(Debug, Serialize)]
pub struct ExpenseOutput {
    pub name: String,
    /// Absent amounts are handed off as zero.
    pub amount: f64,
    pub category: String,
    pub date: Option<NaiveDate>,
    pub receipt_image: Option<ReceiptImage>,
}
