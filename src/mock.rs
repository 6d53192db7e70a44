//! Mock host and engine for testing and development.
//!
//! Keeps the same contract as a real host engine while letting tests script
//! notifications and inspect the requests a session issued. A mock engine
//! never captures audio; every event is emitted by hand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use crate::engine::{EngineConfig, EngineError, EngineEvent, SpeechEngine};
use crate::host::HostCapabilities;

/// Shared view into one mock engine handle: the config it was given, the
/// start/stop requests it received, and the channel it emits into.
#[derive(Default)]
pub struct MockEngineState {
    config: Mutex<Option<EngineConfig>>,
    sender: Mutex<Option<UnboundedSender<EngineEvent>>>,
    running: AtomicBool,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    fail_next_start: Mutex<Option<EngineError>>,
}

impl MockEngineState {
    /// Deliver a notification as the host engine would. Dropped silently when
    /// nothing is subscribed.
    pub fn emit(&self, event: EngineEvent) {
        if let Some(sender) = self.sender.lock().unwrap().as_ref() {
            let _ = sender.send(event);
        }
    }

    pub fn emit_started(&self) {
        self.emit(EngineEvent::Started);
    }

    /// Marks the engine stopped, then delivers the end notification.
    pub fn emit_ended(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.emit(EngineEvent::Ended);
    }

    /// Make the next start request fail with `err`.
    pub fn fail_next_start(&self, err: EngineError) {
        *self.fail_next_start.lock().unwrap() = Some(err);
    }

    pub fn config(&self) -> Option<EngineConfig> {
        self.config.lock().unwrap().clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.sender.lock().unwrap().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

struct MockEngine {
    state: Arc<MockEngineState>,
}

impl SpeechEngine for MockEngine {
    fn configure(&mut self, config: &EngineConfig) {
        *self.state.config.lock().unwrap() = Some(config.clone());
    }

    fn subscribe(&mut self, events: UnboundedSender<EngineEvent>) {
        *self.state.sender.lock().unwrap() = Some(events);
    }

    fn unsubscribe_all(&mut self) {
        *self.state.sender.lock().unwrap() = None;
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.state.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.state.fail_next_start.lock().unwrap().take() {
            return Err(err);
        }
        if self.state.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyStarted);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.state.stop_calls.fetch_add(1, Ordering::SeqCst);
        if !self.state.running.swap(false, Ordering::SeqCst) {
            return Err(EngineError::Failed("not started".to_string()));
        }
        Ok(())
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
    }
}

/// Scriptable host. Tracks every engine handle it constructed so tests can
/// reach the one a session is currently holding.
pub struct MockHost {
    supported: bool,
    identity: String,
    engines: Mutex<Vec<Arc<MockEngineState>>>,
}

impl MockHost {
    /// Desktop-style host: capability present, non-mobile identity.
    pub fn desktop() -> Self {
        Self::with_identity("Mozilla/5.0 (X11; Linux x86_64)")
    }

    /// Mobile-variant host: capability present, identity carries the token.
    pub fn mobile() -> Self {
        Self::with_identity("Mozilla/5.0 (Linux; Android 14; Pixel 8)")
    }

    /// Host with no speech capability at all.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            identity: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
            engines: Mutex::new(Vec::new()),
        }
    }

    pub fn with_identity(identity: &str) -> Self {
        Self {
            supported: true,
            identity: identity.to_string(),
            engines: Mutex::new(Vec::new()),
        }
    }

    /// Number of engine handles constructed so far.
    pub fn engine_count(&self) -> usize {
        self.engines.lock().unwrap().len()
    }

    /// The most recently constructed engine handle, if any.
    pub fn latest_engine(&self) -> Option<Arc<MockEngineState>> {
        self.engines.lock().unwrap().last().map(Arc::clone)
    }
}

impl HostCapabilities for MockHost {
    fn supports_speech(&self) -> bool {
        self.supported
    }

    fn host_identity(&self) -> String {
        self.identity.clone()
    }

    fn new_engine(&self) -> Option<Box<dyn SpeechEngine>> {
        if !self.supported {
            return None;
        }
        let state = Arc::new(MockEngineState::default());
        self.engines.lock().unwrap().push(Arc::clone(&state));
        Some(Box::new(MockEngine { state }))
    }
}
