//! Engine-facing contract for host speech recognition backends.
//!
//! The engine itself is an external collaborator: this crate never captures
//! audio or runs inference. An engine handle is configured once, subscribed
//! to a notification channel, and driven through `start`/`stop` requests
//! whose outcomes are observed asynchronously via [`EngineEvent`]s.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Settings applied to a freshly constructed engine handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Locale tag, e.g. `"zh-CN"` or `"en-US"`.
    pub lang: String,
    /// Keep listening across results instead of ending after one utterance.
    pub continuous: bool,
    /// Report partial (non-final) transcripts.
    pub interim_results: bool,
    /// Number of transcript alternatives per result entry.
    pub max_alternatives: u32,
}

/// One transcript hypothesis within a result entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionAlternative {
    pub transcript: String,
}

/// One entry in the result sequence carried by a result event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub is_final: bool,
    pub alternatives: Vec<RecognitionAlternative>,
}

/// Notifications delivered by an engine over its subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// The engine began capturing.
    Started,
    /// A result sequence. Engines may redeliver a growing/replacing sequence
    /// per event; only the newest entry is actionable.
    Result(Vec<RecognitionResult>),
    /// An engine-reported error code, e.g. `"no-speech"` or `"network"`.
    Error(String),
    /// The engine stopped capturing, naturally or on request.
    Ended,
}

/// Failure modes for synchronous engine requests.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine is already capturing. Duplicate start requests are normal
    /// operation noise, never surfaced to the embedding application.
    #[error("recognition already started")]
    AlreadyStarted,
    /// Any other rejection, carrying the engine's own message.
    #[error("{0}")]
    Failed(String),
}

/// Handle to a host speech recognition engine.
///
/// Construction is the host's business (see
/// [`HostCapabilities`](crate::host::HostCapabilities)); a fresh handle is
/// created per session init and dropped on destroy.
pub trait SpeechEngine: Send {
    /// Apply recognition settings. Called once, before the first start.
    fn configure(&mut self, config: &EngineConfig);

    /// Route all notifications into `events`. Replaces any prior subscription.
    fn subscribe(&mut self, events: UnboundedSender<EngineEvent>);

    /// Drop the current subscription; no further events are delivered.
    fn unsubscribe_all(&mut self);

    /// Request capture to begin. The actual transition is observed via
    /// [`EngineEvent::Started`].
    fn start(&mut self) -> Result<(), EngineError>;

    /// Request capture to end. Best-effort; the engine may already be
    /// stopping, and the halt is observed via [`EngineEvent::Ended`].
    fn stop(&mut self) -> Result<(), EngineError>;
}
