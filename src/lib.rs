//! Lifecycle wrapper around host-provided speech recognition engines.
//!
//! The host engine is an opaque collaborator reached through two injected
//! seams: [`HostCapabilities`] answers the platform questions and constructs
//! engine handles, and [`SpeechEngine`] is the handle itself. On top of those,
//! [`RecognizerSession`] applies platform policy before anything reaches the
//! embedding application:
//!
//! - mobile-variant hosts get conservative config defaults and a 10 s safety
//!   timer for engines that never end on their own
//! - benign engine errors (`no-speech`, `aborted`) and duplicate start
//!   requests are swallowed
//! - an optional auto-restart mode re-arms listening after a natural end
//!
//! Sessions must live inside a Tokio runtime; all engine notifications are
//! serialized onto a single pump task.

pub mod engine;
pub mod host;
pub mod mock;
mod session;

pub use engine::{
    EngineConfig, EngineError, EngineEvent, RecognitionAlternative, RecognitionResult,
    SpeechEngine,
};
pub use host::HostCapabilities;
pub use session::{
    is_mobile_variant, is_supported, ErrorCallback, LifecycleCallback, RecognizerSession,
    ResultCallback, SessionError, SessionOptions,
};
