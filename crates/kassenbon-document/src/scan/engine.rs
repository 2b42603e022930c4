// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition engine lifecycle.
//
// Loading recognition models is expensive and the loaded engine is cheap to
// reuse, so one engine instance is shared by every scan session for the
// lifetime of the process. `EngineManager` owns that instance:
//
//   Uninitialized -> Initializing -> Ready
//                         |            |
//                         +-> Failed <-+   (construction failure / recognition fault)
//                               |
//                               +-> Uninitialized (next acquire re-creates)
//
// Concurrent `acquire` calls made while an initialization is in flight all
// wait on that one initialization. Initialization runs in its own task, so a
// caller that gives up waiting does not abort it for everyone else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use kassenbon_core::error::{KassenbonError, Result};
use kassenbon_core::progress::ProgressReporter;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// An opaque text recognizer.
///
/// Implementations are called from a blocking worker thread. `recognize`
/// receives encoded image bytes and reports progress as a fraction in
/// `0.0..=1.0`.
pub trait RecognitionEngine: Send + Sync + 'static {
    fn recognize(&self, image: &[u8], progress: &dyn Fn(f32)) -> Result<String>;

    /// Release engine resources. Called once when the engine is discarded
    /// after a fault.
    fn terminate(&self) {}
}

/// Builds recognition engines. Construction may block for a long time.
pub trait EngineFactory: Send + Sync + 'static {
    fn create(&self) -> Result<Arc<dyn RecognitionEngine>>;
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// A reference to the shared engine, tagged with the generation it was
/// created in.
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<dyn RecognitionEngine>,
    generation: u64,
}

impl EngineHandle {
    pub fn engine(&self) -> &Arc<dyn RecognitionEngine> {
        &self.engine
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether two handles point at the same engine instance.
    pub fn same_engine(&self, other: &EngineHandle) -> bool {
        Arc::ptr_eq(&self.engine, &other.engine)
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Result published by an initialization task. The error side carries only
/// the detail text so it can be cloned to every waiter.
type InitOutcome = std::result::Result<EngineHandle, String>;

enum Slot {
    Uninitialized,
    Initializing {
        generation: u64,
        done: watch::Receiver<Option<InitOutcome>>,
    },
    Ready(EngineHandle),
    Failed,
}

impl Slot {
    fn state(&self) -> EngineState {
        match self {
            Self::Uninitialized => EngineState::Uninitialized,
            Self::Initializing { .. } => EngineState::Initializing,
            Self::Ready(_) => EngineState::Ready,
            Self::Failed => EngineState::Failed,
        }
    }
}

struct Inner {
    factory: Arc<dyn EngineFactory>,
    slot: Mutex<Slot>,
    next_generation: AtomicU64,
    initializations: AtomicU64,
}

/// Owner of the shared recognition engine.
///
/// Cloning is cheap and every clone manages the same engine. Create one per
/// process (or one per test).
#[derive(Clone)]
pub struct EngineManager {
    inner: Arc<Inner>,
}

impl EngineManager {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory,
                slot: Mutex::new(Slot::Uninitialized),
                next_generation: AtomicU64::new(1),
                initializations: AtomicU64::new(0),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.inner.slot.lock().expect("engine slot lock poisoned").state()
    }

    /// Number of engine constructions started so far.
    pub fn initializations(&self) -> u64 {
        self.inner.initializations.load(Ordering::SeqCst)
    }

    /// Obtain a ready engine, creating it if necessary.
    ///
    /// Returns immediately when an engine is cached; joins an in-flight
    /// initialization instead of starting another one.
    ///
    /// # Errors
    ///
    /// Returns [`KassenbonError::EngineInit`] if construction fails. The
    /// cached state is cleared so the next call starts over.
    #[instrument(skip_all)]
    pub async fn acquire(&self, progress: &ProgressReporter) -> Result<EngineHandle> {
        let mut done = {
            let mut slot = self.inner.slot.lock().expect("engine slot lock poisoned");
            match &*slot {
                Slot::Ready(handle) => {
                    debug!(generation = handle.generation, "reusing ready engine");
                    return Ok(handle.clone());
                }
                Slot::Initializing { generation, done } => {
                    debug!(generation, "joining in-flight engine initialisation");
                    done.clone()
                }
                Slot::Uninitialized | Slot::Failed => {
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
                    let (tx, rx) = watch::channel(None);
                    *slot = Slot::Initializing {
                        generation,
                        done: rx.clone(),
                    };
                    self.spawn_initialization(generation, tx);
                    rx
                }
            }
        };

        progress.status("initializing engine");

        let outcome = match done.wait_for(Option::is_some).await {
            Ok(published) => published.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(Ok(handle)) => Ok(handle),
            Some(Err(detail)) => Err(KassenbonError::EngineInit(detail)),
            None => Err(KassenbonError::EngineInit(
                "initialisation ended without a result".into(),
            )),
        }
    }

    fn spawn_initialization(&self, generation: u64, tx: watch::Sender<Option<InitOutcome>>) {
        let inner = Arc::clone(&self.inner);
        inner.initializations.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            info!(generation, "Initialising recognition engine");
            let factory = Arc::clone(&inner.factory);
            let created = match tokio::task::spawn_blocking(move || factory.create()).await {
                Ok(result) => result,
                Err(join_err) => Err(KassenbonError::EngineInit(format!(
                    "initialisation worker died: {join_err}"
                ))),
            };

            let outcome = {
                let mut slot = inner.slot.lock().expect("engine slot lock poisoned");
                match created {
                    Ok(engine) => {
                        let handle = EngineHandle { engine, generation };
                        *slot = Slot::Ready(handle.clone());
                        info!(generation, "Recognition engine ready");
                        Ok(handle)
                    }
                    Err(err) => {
                        *slot = Slot::Failed;
                        warn!(generation, error = %err, "Recognition engine initialisation failed");
                        Err(match err {
                            KassenbonError::EngineInit(detail) => detail,
                            other => other.to_string(),
                        })
                    }
                }
            };
            tx.send_replace(Some(outcome));
        });
    }

    /// Hand a handle back after a completed or cancelled scan.
    ///
    /// The engine stays cached; nothing is torn down.
    pub fn release(&self, handle: EngineHandle) {
        debug!(generation = handle.generation, "engine handle released, keeping engine warm");
    }

    /// Discard the engine after a recognition fault.
    ///
    /// Terminates the engine and clears the cache so the next `acquire`
    /// re-initializes. A handle from an older generation is ignored, so a
    /// late fault never tears down a newer engine. Returns whether the engine
    /// was discarded.
    #[instrument(skip_all, fields(generation = handle.generation))]
    pub fn invalidate(&self, handle: &EngineHandle) -> bool {
        let evicted = {
            let mut slot = self.inner.slot.lock().expect("engine slot lock poisoned");
            match &*slot {
                Slot::Ready(current) if current.generation == handle.generation => {
                    Some(std::mem::replace(&mut *slot, Slot::Failed))
                }
                _ => None,
            }
        };

        match evicted {
            Some(Slot::Ready(current)) => {
                warn!("Recognition fault, terminating cached engine");
                current.engine.terminate();
                true
            }
            _ => {
                debug!("stale invalidation ignored");
                false
            }
        }
    }
}

impl std::fmt::Debug for EngineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineManager")
            .field("state", &self.state())
            .field("initializations", &self.initializations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    struct EchoEngine {
        terminated: Arc<AtomicBool>,
    }

    impl RecognitionEngine for EchoEngine {
        fn recognize(&self, image: &[u8], progress: &dyn Fn(f32)) -> Result<String> {
            progress(1.0);
            Ok(format!("{} bytes", image.len()))
        }

        fn terminate(&self) {
            self.terminated.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
        failures_left: AtomicUsize,
        delay: Duration,
        terminated: Arc<AtomicBool>,
    }

    impl CountingFactory {
        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn failing(times: usize) -> Self {
            Self {
                failures_left: AtomicUsize::new(times),
                ..Self::default()
            }
        }
    }

    impl EngineFactory for CountingFactory {
        fn create(&self) -> Result<Arc<dyn RecognitionEngine>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(KassenbonError::EngineInit("model file corrupt".into()));
            }
            Ok(Arc::new(EchoEngine {
                terminated: Arc::clone(&self.terminated),
            }))
        }
    }

    #[tokio::test]
    async fn concurrent_acquire_initializes_once() {
        let factory = Arc::new(CountingFactory::slow(Duration::from_millis(50)));
        let manager = EngineManager::new(factory.clone());
        let progress = ProgressReporter::detached();

        let (a, b) = tokio::join!(manager.acquire(&progress), manager.acquire(&progress));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.same_engine(&b));
        assert_eq!(a.generation(), b.generation());
        assert_eq!(manager.initializations(), 1);
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), EngineState::Ready);
    }

    #[tokio::test]
    async fn ready_engine_is_reused() {
        let manager = EngineManager::new(Arc::new(CountingFactory::default()));
        let progress = ProgressReporter::detached();

        let first = manager.acquire(&progress).await.unwrap();
        manager.release(first.clone());
        let second = manager.acquire(&progress).await.unwrap();

        assert!(first.same_engine(&second));
        assert_eq!(manager.initializations(), 1);
    }

    #[tokio::test]
    async fn construction_failure_clears_cache() {
        let factory = Arc::new(CountingFactory::failing(1));
        let manager = EngineManager::new(factory.clone());
        let progress = ProgressReporter::detached();

        let err = manager.acquire(&progress).await.unwrap_err();
        assert!(matches!(err, KassenbonError::EngineInit(ref d) if d == "model file corrupt"));
        assert_eq!(manager.state(), EngineState::Failed);

        manager.acquire(&progress).await.unwrap();
        assert_eq!(manager.initializations(), 2);
        assert_eq!(manager.state(), EngineState::Ready);
    }

    #[tokio::test]
    async fn concurrent_waiters_share_the_failure() {
        let factory = Arc::new(CountingFactory {
            delay: Duration::from_millis(30),
            ..CountingFactory::failing(1)
        });
        let manager = EngineManager::new(factory.clone());
        let progress = ProgressReporter::detached();

        let (a, b) = tokio::join!(manager.acquire(&progress), manager.acquire(&progress));
        assert!(a.is_err());
        assert!(b.is_err());
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_reinitialization() {
        let factory = Arc::new(CountingFactory::default());
        let manager = EngineManager::new(factory.clone());
        let progress = ProgressReporter::detached();

        let before = manager.acquire(&progress).await.unwrap();
        assert!(manager.invalidate(&before));
        assert_eq!(manager.state(), EngineState::Failed);
        assert!(factory.terminated.load(Ordering::SeqCst));

        let after = manager.acquire(&progress).await.unwrap();
        assert!(!before.same_engine(&after));
        assert!(after.generation() > before.generation());
        assert_eq!(manager.initializations(), 2);
    }

    #[tokio::test]
    async fn stale_invalidation_keeps_newer_engine() {
        let manager = EngineManager::new(Arc::new(CountingFactory::default()));
        let progress = ProgressReporter::detached();

        let old = manager.acquire(&progress).await.unwrap();
        manager.invalidate(&old);
        let fresh = manager.acquire(&progress).await.unwrap();

        assert!(!manager.invalidate(&old));
        assert_eq!(manager.state(), EngineState::Ready);
        let again = manager.acquire(&progress).await.unwrap();
        assert!(again.same_engine(&fresh));
    }

    #[tokio::test]
    async fn abandoned_acquire_does_not_abort_initialization() {
        let manager = EngineManager::new(Arc::new(CountingFactory::slow(Duration::from_millis(80))));
        let progress = ProgressReporter::detached();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(5), manager.acquire(&progress)).await;
        assert!(timed_out.is_err());
        assert_eq!(manager.state(), EngineState::Initializing);

        manager.acquire(&progress).await.unwrap();
        assert_eq!(manager.initializations(), 1);
    }

    #[tokio::test]
    async fn acquire_reports_initializing_status() {
        let manager = EngineManager::new(Arc::new(CountingFactory::default()));
        let (progress, stream) = ProgressReporter::channel();
        manager.acquire(&progress).await.unwrap();
        assert_eq!(stream.latest().status, "initializing engine");
    }
}
