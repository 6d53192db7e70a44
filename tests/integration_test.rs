//! End-to-end session flows driven through the public API and the mock host.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use speech_session::mock::MockHost;
use speech_session::{
    EngineEvent, HostCapabilities, RecognitionAlternative, RecognitionResult, RecognizerSession,
    SessionOptions,
};

fn init_logs() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn result_entry(transcript: &str, is_final: bool) -> Vec<RecognitionResult> {
    vec![RecognitionResult {
        is_final,
        alternatives: vec![RecognitionAlternative {
            transcript: transcript.to_string(),
        }],
    }]
}

/// Desktop dictation: interim results stream in, a final result lands, the
/// caller stops, and the end notification is reported once.
#[tokio::test(start_paused = true)]
async fn desktop_dictation_flow() {
    init_logs();

    let transcript = Arc::new(Mutex::new(Vec::new()));
    let ends = Arc::new(AtomicUsize::new(0));
    let host = Arc::new(MockHost::desktop());

    let session = RecognizerSession::new(
        Arc::clone(&host) as Arc<dyn HostCapabilities>,
        SessionOptions {
            lang: Some("en-US".to_string()),
            on_result: Some({
                let transcript = Arc::clone(&transcript);
                Arc::new(move |text, is_final| {
                    transcript.lock().unwrap().push((text.to_string(), is_final));
                })
            }),
            on_end: Some({
                let ends = Arc::clone(&ends);
                Arc::new(move || {
                    ends.fetch_add(1, Ordering::SeqCst);
                })
            }),
            ..Default::default()
        },
    );

    session.start(false).unwrap();
    let engine = host.latest_engine().unwrap();
    engine.emit_started();
    engine.emit(EngineEvent::Result(result_entry("  hello ", false)));
    engine.emit(EngineEvent::Result(result_entry("hello world", true)));
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert!(session.is_listening());
    assert_eq!(
        *transcript.lock().unwrap(),
        vec![
            ("hello".to_string(), false),
            ("hello world".to_string(), true),
        ]
    );

    session.stop();
    assert_eq!(engine.stop_calls(), 1);
    engine.emit_ended();
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert!(!session.is_listening());
    assert_eq!(ends.load(Ordering::SeqCst), 1);
}

/// Mobile safety valve: the engine never ends on its own, so the session
/// forces a stop after ten seconds and the end is reported normally.
#[tokio::test(start_paused = true)]
async fn mobile_safety_valve_flow() {
    init_logs();

    let ends = Arc::new(AtomicUsize::new(0));
    let host = Arc::new(MockHost::mobile());

    let session = RecognizerSession::new(
        Arc::clone(&host) as Arc<dyn HostCapabilities>,
        SessionOptions {
            on_end: Some({
                let ends = Arc::clone(&ends);
                Arc::new(move || {
                    ends.fetch_add(1, Ordering::SeqCst);
                })
            }),
            ..Default::default()
        },
    );

    // Mobile defaults: single-utterance, no interim results.
    assert!(!session.config().continuous);
    assert!(!session.config().interim_results);

    session.start(false).unwrap();
    let engine = host.latest_engine().unwrap();
    engine.emit_started();
    tokio::time::sleep(Duration::from_millis(10_500)).await;

    // The safety timer stopped the engine; the engine reports its end.
    assert_eq!(engine.stop_calls(), 1);
    assert!(!engine.is_running());
    engine.emit_ended();
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(ends.load(Ordering::SeqCst), 1);
    assert!(!session.is_listening());
}

/// A destroyed session can be revived: start() lazily builds a fresh engine.
#[tokio::test(start_paused = true)]
async fn session_survives_destroy_and_restart() {
    init_logs();

    let host = Arc::new(MockHost::desktop());
    let session = RecognizerSession::new(Arc::clone(&host) as Arc<dyn HostCapabilities>, SessionOptions::default());

    session.start(false).unwrap();
    session.destroy();
    session.start(false).unwrap();

    assert_eq!(host.engine_count(), 2);
    let engine = host.latest_engine().unwrap();
    assert_eq!(engine.start_calls(), 1);
    engine.emit_started();
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(session.is_listening());
}
