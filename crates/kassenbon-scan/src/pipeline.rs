// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner pipeline.
//
// Drives one session at a time through
//
//   AwaitingInput -> Previewing -> Processing -> Reviewing
//                        ^             |
//                        +-------------+  (cancelled, or failed with a message)
//
// Progress bands: engine acquisition 0-15 %, recognition 15-95 %,
// extraction 95-100 %.
//
// Recognition runs on a blocking worker inside its own task. Cancelling a
// scan only changes the session: the worker keeps going in the background,
// its result is discarded, and the engine stays warm. A faulting worker tears
// the engine down itself, whether or not anyone is still waiting for it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kassenbon_core::config::ScanConfig;
use kassenbon_core::display::DisplayRegistry;
use kassenbon_core::error::{KassenbonError, Result};
use kassenbon_core::human_errors::{UserMessage, humanize_error};
use kassenbon_core::progress::{ProgressBand, ProgressReporter, ProgressStream};
use kassenbon_core::types::{ExpenseOutput, ExtractedRecord, RawImageInput, ScanPhase};
use kassenbon_document::{EngineHandle, EngineManager, ImagePreprocessor};
use kassenbon_extract::{RetentionPolicy, TextExtractionEngine};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::session::{CancelHandle, ScanSession};
use crate::sink::ExpenseSink;

const ACQUIRED_PERCENT: u8 = 15;
const RECOGNIZED_PERCENT: u8 = 95;

/// How a scan that did not fail ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Extraction finished; the session is now reviewing this record.
    Completed(ExtractedRecord),
    /// The user cancelled; the session is back to previewing.
    Cancelled,
}

enum Recognition {
    Text(String),
    Cancelled,
}

fn invalid_phase(operation: &'static str, phase: ScanPhase) -> KassenbonError {
    KassenbonError::InvalidPhase {
        operation,
        phase: phase.to_string(),
    }
}

/// The receipt scanner.
pub struct ScanPipeline {
    preprocessor: ImagePreprocessor,
    engines: EngineManager,
    extractor: TextExtractionEngine,
    retention: RetentionPolicy,
    progress: ProgressReporter,
    cancel: CancelHandle,
    session: Option<ScanSession>,
    /// Recognition left running by a cancelled scan.
    abandoned: Option<JoinHandle<Result<String>>>,
}

impl ScanPipeline {
    /// Build a pipeline around a shared engine manager.
    ///
    /// # Errors
    ///
    /// Returns [`KassenbonError::Config`] if `config` is invalid.
    pub fn new(config: &ScanConfig, engines: EngineManager, registry: DisplayRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            preprocessor: ImagePreprocessor::new(config, registry),
            engines,
            extractor: TextExtractionEngine::new(),
            retention: RetentionPolicy::new(config.retention_threshold),
            progress: ProgressReporter::detached(),
            cancel: CancelHandle::new(),
            session: None,
            abandoned: None,
        })
    }

    pub fn phase(&self) -> ScanPhase {
        self.session
            .as_ref()
            .map_or(ScanPhase::AwaitingInput, ScanSession::phase)
    }

    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    /// The last user-facing failure of the current session.
    pub fn error(&self) -> Option<UserMessage> {
        self.session.as_ref().and_then(ScanSession::error)
    }

    /// Subscribe to progress events.
    pub fn progress(&self) -> ProgressStream {
        self.progress.subscribe()
    }

    /// A handle that cancels whichever scan is running when it fires.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn engines(&self) -> &EngineManager {
        &self.engines
    }

    pub fn registry(&self) -> &DisplayRegistry {
        self.preprocessor.registry()
    }

    fn session_in(&mut self, operation: &'static str, allowed: &[ScanPhase]) -> Result<&mut ScanSession> {
        let phase = self.phase();
        match self.session.as_mut() {
            Some(session) if allowed.contains(&phase) => Ok(session),
            _ => Err(invalid_phase(operation, phase)),
        }
    }

    /// Validate and normalize a new receipt image and start previewing it.
    ///
    /// Replaces any image already shown, releasing its display handle. On
    /// invalid input the phase is left as it was.
    ///
    /// # Errors
    ///
    /// [`KassenbonError::InvalidInput`] for non-image or oversized input and
    /// undecodable bytes; [`KassenbonError::InvalidPhase`] while processing
    /// or reviewing.
    #[instrument(skip_all, fields(media_type = raw.media_type(), byte_len = raw.byte_len()))]
    pub async fn load_image(&mut self, raw: RawImageInput) -> Result<()> {
        let phase = self.phase();
        if !matches!(phase, ScanPhase::AwaitingInput | ScanPhase::Previewing) {
            return Err(invalid_phase("load_image", phase));
        }

        let preprocessor = self.preprocessor.clone();
        let preprocessed =
            match tokio::task::spawn_blocking(move || preprocessor.preprocess(raw)).await {
                Ok(result) => result,
                Err(join_err) => Err(KassenbonError::ImageError(format!(
                    "preprocessing worker died: {join_err}"
                ))),
            };

        match preprocessed {
            Ok(image) => {
                let session = ScanSession::new(image);
                info!(
                    session = %session.id(),
                    width = session.image().width,
                    height = session.image().height,
                    "Receipt image loaded"
                );
                self.session = Some(session);
                self.progress.reset();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Receipt image rejected");
                if let Some(session) = self.session.as_mut() {
                    session.error = Some(humanize_error(&err));
                }
                Err(err)
            }
        }
    }

    /// Recognize the previewed image and extract an expense record.
    ///
    /// # Errors
    ///
    /// [`KassenbonError::EngineInit`] or [`KassenbonError::Recognition`] on an
    /// engine fault (the session returns to previewing with
    /// [`UserMessage::ScanFailed`]); [`KassenbonError::InvalidPhase`] unless
    /// previewing.
    #[instrument(skip_all)]
    pub async fn scan(&mut self) -> Result<ScanOutcome> {
        let session = self.session_in("scan", &[ScanPhase::Previewing])?;
        session.begin_scan();
        let session_id = session.id();
        let image = session.image.bytes.clone();
        info!(session = %session_id, "Scan started");

        self.cancel.reset();
        self.progress.reset();
        let recognized = self.recognize(image).await;

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| invalid_phase("scan", ScanPhase::AwaitingInput))?;
        match recognized {
            Ok(Recognition::Text(text)) => {
                self.progress.report(RECOGNIZED_PERCENT, "extracting details");
                let record = self.extractor.extract(&text);
                session.raw_text = Some(text);
                session.record = Some(record.clone());
                session.phase = ScanPhase::Reviewing;
                self.progress.report(100, "done");
                info!(session = %session_id, "Scan completed");
                Ok(ScanOutcome::Completed(record))
            }
            Ok(Recognition::Cancelled) => {
                session.phase = ScanPhase::Previewing;
                self.progress.status("cancelled");
                info!(session = %session_id, "Scan cancelled");
                Ok(ScanOutcome::Cancelled)
            }
            Err(err) => {
                session.phase = ScanPhase::Previewing;
                session.error = Some(humanize_error(&err));
                self.progress.status("scan failed");
                warn!(session = %session_id, error = %err, "Scan failed");
                Err(err)
            }
        }
    }

    async fn recognize(&mut self, image: Vec<u8>) -> Result<Recognition> {
        let cancel = self.cancel.clone();

        // One recognition per engine at a time: let a cancelled one finish
        // first. It may fault and tear the engine down, so acquire after.
        if let Some(mut previous) = self.abandoned.take() {
            debug!("waiting for abandoned recognition to finish");
            self.progress.status("waiting for previous recognition");
            tokio::select! {
                biased;
                _ = &mut previous => {}
                _ = cancel.cancelled() => {
                    self.abandoned = Some(previous);
                    return Ok(Recognition::Cancelled);
                }
            }
        }

        self.progress.report(0, "acquiring engine");
        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Recognition::Cancelled),
            acquired = self.engines.acquire(&self.progress) => acquired?,
        };
        self.progress.report(ACQUIRED_PERCENT, "engine ready");

        let discarded = Arc::new(AtomicBool::new(false));
        let band = self.progress.band(ACQUIRED_PERCENT, RECOGNIZED_PERCENT);
        band.report(0.0, "recognizing text");
        let mut worker = self.spawn_recognition(handle.clone(), image, band, Arc::clone(&discarded));

        tokio::select! {
            biased;
            joined = &mut worker => {
                let text = match joined {
                    Ok(result) => result?,
                    Err(join_err) => {
                        self.engines.invalidate(&handle);
                        return Err(KassenbonError::Recognition(format!(
                            "recognition task died: {join_err}"
                        )));
                    }
                };
                self.engines.release(handle);
                Ok(Recognition::Text(text))
            }
            _ = cancel.cancelled() => {
                discarded.store(true, Ordering::SeqCst);
                self.engines.release(handle);
                self.abandoned = Some(worker);
                Ok(Recognition::Cancelled)
            }
        }
    }

    fn spawn_recognition(
        &self,
        handle: EngineHandle,
        image: Vec<u8>,
        band: ProgressBand,
        discarded: Arc<AtomicBool>,
    ) -> JoinHandle<Result<String>> {
        let engines = self.engines.clone();
        tokio::spawn(async move {
            let engine = Arc::clone(handle.engine());
            let recognized = tokio::task::spawn_blocking(move || {
                engine.recognize(&image, &|fraction| {
                    if !discarded.load(Ordering::SeqCst) {
                        band.report(fraction, "recognizing text");
                    }
                })
            })
            .await;

            let result = match recognized {
                Ok(result) => result,
                Err(join_err) => Err(KassenbonError::Recognition(format!(
                    "recognition worker died: {join_err}"
                ))),
            };
            if let Err(err) = &result {
                warn!(generation = handle.generation(), error = %err, "Recognition faulted, discarding engine");
                engines.invalidate(&handle);
            }
            result
        })
    }

    /// The record under review, for user edits.
    pub fn record_mut(&mut self) -> Result<&mut ExtractedRecord> {
        self.session_in("record_mut", &[ScanPhase::Reviewing])?
            .record
            .as_mut()
            .ok_or_else(|| invalid_phase("record_mut", ScanPhase::Reviewing))
    }

    /// Confirm the reviewed record and end the session.
    ///
    /// The image is attached only when the (possibly edited) amount reaches
    /// the retention threshold; otherwise its display handle is released
    /// before this returns. An absent amount is handed off as zero.
    #[instrument(skip_all)]
    pub fn use_data(&mut self) -> Result<ExpenseOutput> {
        let phase = self.phase();
        let session = match self.session.take() {
            Some(session) if phase == ScanPhase::Reviewing => session,
            other => {
                self.session = other;
                return Err(invalid_phase("use_data", phase));
            }
        };

        let record = session.record.unwrap_or_default();
        let decision = self.retention.apply(record.amount, session.image);
        info!(
            amount = ?record.amount,
            retained = decision.retain,
            "Expense handed off"
        );
        self.progress.reset();

        Ok(ExpenseOutput {
            name: record.merchant,
            amount: record.amount.unwrap_or(0.0),
            category: record.category,
            date: record.date,
            receipt_image: decision.image,
        })
    }

    /// [`use_data`](Self::use_data), then persist the output to `sink`. The
    /// session has ended even if the sink fails.
    pub fn hand_off(&mut self, sink: &dyn ExpenseSink) -> Result<()> {
        let expense = self.use_data()?;
        sink.persist(expense)
    }

    /// Drop the current session and wait for a new image.
    pub fn start_over(&mut self) -> Result<()> {
        let phase = self.phase();
        if phase == ScanPhase::AwaitingInput {
            return Err(invalid_phase("start_over", phase));
        }
        self.session = None;
        self.progress.reset();
        debug!("Scanner started over");
        Ok(())
    }

    /// Close the scanner from any phase, releasing the session's image.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(session = %session.id(), "Scanner closed");
        }
        self.progress.reset();
    }
}
