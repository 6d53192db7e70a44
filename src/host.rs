//! Injected host capability surface.
//!
//! Instead of probing ambient globals, the session is handed an object that
//! answers the two platform questions and constructs engine handles. This
//! keeps the session logic testable against a fake host (see [`crate::mock`]).

use crate::engine::SpeechEngine;

/// The host environment as the session sees it.
pub trait HostCapabilities: Send + Sync {
    /// True when the host exposes a speech recognition engine. Hosts commonly
    /// publish the capability under one of two legacy names; either counts.
    fn supports_speech(&self) -> bool;

    /// Identifying string for the host platform, user-agent style. Used for
    /// mobile-variant detection, never parsed beyond a substring match.
    fn host_identity(&self) -> String;

    /// Construct a fresh engine handle, or `None` when unsupported.
    fn new_engine(&self) -> Option<Box<dyn SpeechEngine>>;
}
