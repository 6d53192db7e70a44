//! Recognizer session: lifecycle, platform policy, and timers around a host
//! speech engine.
//!
//! All engine notifications are funneled through a single pump task, so state
//! transitions never run concurrently with each other. Callbacks are invoked
//! with no internal lock held; calling back into the session from a callback
//! is allowed.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{EngineConfig, EngineError, EngineEvent, RecognitionResult, SpeechEngine};
use crate::host::HostCapabilities;

const DEFAULT_LANG: &str = "zh-CN";
const MAX_ALTERNATIVES: u32 = 1;
/// Mobile-variant engines may never end on their own; force a stop after this.
const SAFETY_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Debounce between an engine end and the auto-restart that follows it.
const RESTART_DELAY: Duration = Duration::from_millis(100);
/// Engine error codes treated as normal operation noise.
const SUPPRESSED_ERRORS: [&str; 2] = ["no-speech", "aborted"];
/// Host identity token marking the mobile variant.
const MOBILE_TOKEN: &str = "android";

/// Receives `(transcript, is_final)` for every non-empty result.
pub type ResultCallback = Arc<dyn Fn(&str, bool) + Send + Sync>;
/// Receives engine error codes and start-failure messages.
pub type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;
/// Start/end lifecycle hook.
pub type LifecycleCallback = Arc<dyn Fn() + Send + Sync>;

/// Synchronous session failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("host does not support speech recognition")]
    UnsupportedPlatform,
}

/// True when the host exposes a speech recognition capability.
pub fn is_supported(host: &dyn HostCapabilities) -> bool {
    host.supports_speech()
}

/// True when the host identity marks the mobile variant of the engine
/// (case-insensitive substring match).
pub fn is_mobile_variant(host: &dyn HostCapabilities) -> bool {
    host.host_identity()
        .to_ascii_lowercase()
        .contains(MOBILE_TOKEN)
}

/// Construction options. Unset fields resolve against the mobile predicate:
/// mobile-variant hosts default `continuous` and `interim_results` to false,
/// everything else defaults them to true.
#[derive(Clone, Default)]
pub struct SessionOptions {
    pub lang: Option<String>,
    pub continuous: Option<bool>,
    pub interim_results: Option<bool>,
    pub on_result: Option<ResultCallback>,
    pub on_error: Option<ErrorCallback>,
    pub on_start: Option<LifecycleCallback>,
    pub on_end: Option<LifecycleCallback>,
}

struct Callbacks {
    on_result: ResultCallback,
    on_error: ErrorCallback,
    on_start: LifecycleCallback,
    on_end: LifecycleCallback,
}

/// State mutated by the lifecycle methods and the pump task.
struct Inner {
    engine: Option<Box<dyn SpeechEngine>>,
    /// Observed state: set only by the engine's started/ended notifications,
    /// never by a command return.
    is_listening: bool,
    /// Set per start call; cleared by stop and by the rescheduled start.
    auto_restart: bool,
    /// Mobile safety timer. At most one pending per listening session.
    timeout_task: Option<JoinHandle<()>>,
    pump_task: Option<JoinHandle<()>>,
}

struct SessionCore {
    host: Arc<dyn HostCapabilities>,
    config: EngineConfig,
    callbacks: Callbacks,
    inner: Mutex<Inner>,
}

/// A reusable recognition session over a host engine.
///
/// Created once by the embedding application and driven through repeated
/// `start`/`stop` cycles; the engine handle itself churns across restarts.
/// Must live inside a Tokio runtime: the event pump and both timers are
/// spawned tasks.
pub struct RecognizerSession {
    core: Arc<SessionCore>,
}

impl RecognizerSession {
    pub fn new(host: Arc<dyn HostCapabilities>, options: SessionOptions) -> Self {
        let mobile = is_mobile_variant(host.as_ref());
        let config = EngineConfig {
            lang: options.lang.unwrap_or_else(|| DEFAULT_LANG.to_string()),
            continuous: options.continuous.unwrap_or(!mobile),
            interim_results: options.interim_results.unwrap_or(!mobile),
            max_alternatives: MAX_ALTERNATIVES,
        };
        let callbacks = Callbacks {
            on_result: options.on_result.unwrap_or_else(|| Arc::new(|_, _| {})),
            on_error: options.on_error.unwrap_or_else(|| Arc::new(|_| {})),
            on_start: options.on_start.unwrap_or_else(|| Arc::new(|| {})),
            on_end: options.on_end.unwrap_or_else(|| Arc::new(|| {})),
        };
        Self {
            core: Arc::new(SessionCore {
                host,
                config,
                callbacks,
                inner: Mutex::new(Inner {
                    engine: None,
                    is_listening: false,
                    auto_restart: false,
                    timeout_task: None,
                    pump_task: None,
                }),
            }),
        }
    }

    /// Resolved recognition settings for this session.
    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    /// Whether the engine is currently capturing, as observed through its
    /// notifications.
    pub fn is_listening(&self) -> bool {
        self.core.inner.lock().unwrap().is_listening
    }

    /// Construct and wire a fresh engine handle, replacing any existing one.
    ///
    /// Callers normally never invoke this directly; `start` does it lazily
    /// when no handle exists.
    pub fn init(&self) -> Result<&Self, SessionError> {
        self.core.init()?;
        Ok(self)
    }

    /// Request the engine to start capturing, initializing it first if
    /// needed. With `auto_restart`, a natural engine end in continuous mode
    /// schedules a fresh start instead of reporting the end.
    pub fn start(&self, auto_restart: bool) -> Result<&Self, SessionError> {
        self.core.start(auto_restart)?;
        Ok(self)
    }

    /// Best-effort stop request. Never fails; the actual halt is observed
    /// later through the end notification.
    pub fn stop(&self) -> &Self {
        self.core.stop();
        self
    }

    /// Stop, unwire, and release the engine handle. Idempotent.
    pub fn destroy(&self) {
        self.core.destroy();
    }
}

impl Drop for RecognizerSession {
    fn drop(&mut self) {
        self.core.destroy();
    }
}

impl SessionCore {
    fn init(self: &Arc<Self>) -> Result<(), SessionError> {
        if !self.host.supports_speech() {
            return Err(SessionError::UnsupportedPlatform);
        }
        let mut engine = self
            .host
            .new_engine()
            .ok_or(SessionError::UnsupportedPlatform)?;
        engine.configure(&self.config);

        let (tx, rx) = mpsc::unbounded_channel();
        engine.subscribe(tx);
        let pump = tokio::spawn(pump_events(Arc::downgrade(self), rx));

        debug!(lang = %self.config.lang, continuous = self.config.continuous, "engine initialized");

        let mut inner = self.inner.lock().unwrap();
        // Replacing an existing handle drops it without explicit teardown.
        inner.engine = Some(engine);
        if let Some(old) = inner.pump_task.replace(pump) {
            old.abort();
        }
        Ok(())
    }

    fn start(self: &Arc<Self>, auto_restart: bool) -> Result<(), SessionError> {
        let needs_init = self.inner.lock().unwrap().engine.is_none();
        if needs_init {
            self.init()?;
        }

        let start_err = {
            let mut inner = self.inner.lock().unwrap();
            inner.auto_restart = auto_restart;
            match inner.engine.as_mut() {
                Some(engine) => engine.start().err(),
                None => None,
            }
        };
        match start_err {
            Some(EngineError::AlreadyStarted) => {
                debug!("duplicate start request ignored");
            }
            Some(err) => (self.callbacks.on_error)(&err.to_string()),
            None => {}
        }
        Ok(())
    }

    fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.auto_restart = false;
        if inner.is_listening {
            if let Some(engine) = inner.engine.as_mut() {
                if let Err(err) = engine.stop() {
                    // The engine may already be stopping on its own.
                    debug!(%err, "stop request rejected");
                }
            }
        }
        if let Some(timer) = inner.timeout_task.take() {
            timer.abort();
        }
    }

    fn destroy(&self) {
        self.stop();
        let mut inner = self.inner.lock().unwrap();
        if let Some(mut engine) = inner.engine.take() {
            engine.unsubscribe_all();
        }
        if let Some(pump) = inner.pump_task.take() {
            pump.abort();
        }
        if let Some(timer) = inner.timeout_task.take() {
            timer.abort();
        }
    }

    fn handle_started(self: &Arc<Self>) {
        self.inner.lock().unwrap().is_listening = true;
        debug!("engine started");
        (self.callbacks.on_start)();
        if is_mobile_variant(self.host.as_ref()) {
            self.arm_safety_timer();
        }
    }

    fn handle_result(&self, results: Vec<RecognitionResult>) {
        // Only the newest entry of a redelivered sequence is actionable.
        let Some(newest) = results.last() else {
            return;
        };
        let text = newest
            .alternatives
            .first()
            .map(|alt| alt.transcript.trim())
            .unwrap_or("");
        if !text.is_empty() {
            (self.callbacks.on_result)(text, newest.is_final);
        }
        if newest.is_final && is_mobile_variant(self.host.as_ref()) {
            self.cancel_safety_timer();
        }
    }

    fn handle_error(&self, code: String) {
        if SUPPRESSED_ERRORS.contains(&code.as_str()) {
            debug!(code = %code, "suppressed benign engine error");
        } else {
            (self.callbacks.on_error)(&code);
        }
        self.cancel_safety_timer();
    }

    fn handle_ended(self: &Arc<Self>) {
        let restart = {
            let mut inner = self.inner.lock().unwrap();
            inner.is_listening = false;
            if let Some(timer) = inner.timeout_task.take() {
                timer.abort();
            }
            inner.auto_restart && self.config.continuous
        };
        if restart {
            debug!("engine ended; restart scheduled");
            let core = Arc::downgrade(self);
            // Fire-and-forget: no cancel token is retained for the restart
            // delay. The rescheduled start resets the auto-restart flag.
            tokio::spawn(async move {
                tokio::time::sleep(RESTART_DELAY).await;
                if let Some(core) = core.upgrade() {
                    let _ = core.start(false);
                }
            });
        } else {
            debug!("engine ended");
            (self.callbacks.on_end)();
        }
    }

    fn arm_safety_timer(self: &Arc<Self>) {
        let core = Arc::downgrade(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(SAFETY_TIMEOUT).await;
            if let Some(core) = core.upgrade() {
                let listening = core.inner.lock().unwrap().is_listening;
                if listening {
                    warn!("engine never ended on its own; forcing stop");
                    core.stop();
                }
            }
        });
        let mut inner = self.inner.lock().unwrap();
        if let Some(old) = inner.timeout_task.take() {
            old.abort();
        }
        inner.timeout_task = Some(timer);
    }

    fn cancel_safety_timer(&self) {
        if let Some(timer) = self.inner.lock().unwrap().timeout_task.take() {
            timer.abort();
        }
    }
}

/// Serializes every engine notification onto one task, preserving the
/// no-concurrent-transition invariant on a multi-threaded runtime.
async fn pump_events(core: Weak<SessionCore>, mut rx: mpsc::UnboundedReceiver<EngineEvent>) {
    while let Some(event) = rx.recv().await {
        let Some(core) = core.upgrade() else {
            break;
        };
        match event {
            EngineEvent::Started => core.handle_started(),
            EngineEvent::Result(results) => core.handle_result(results),
            EngineEvent::Error(code) => core.handle_error(code),
            EngineEvent::Ended => core.handle_ended(),
        }
    }
}
