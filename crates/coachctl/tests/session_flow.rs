//! Integration tests for the protocol client and the full session loop,
//! driven against a loopback stand-in for the inference server.

use std::sync::Mutex;

use coach_common::config::CoachConfig;
use coach_common::protocol::ProtocolError;
use coach_common::types::{PlotSeries, SurveyResponse};
use coach_common::SessionError;
use coachctl::client::InferenceClient;
use coachctl::completion::ScriptedCompletion;
use coachctl::controller::SessionController;
use coachctl::render::Renderer;
use coachctl::speech::ScriptedSpeech;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const REPORT_JSON: &str = r#"{
    "prior_stats": {"skill": [5.0, 1.0], "learning_rate": [2.0, 1.0], "difficulty": [3.0, 1.0]},
    "posterior_stats": {"skill": [6.0, 0.8], "learning_rate": [3.0, 1.0], "difficulty": [3.0, 1.0]},
    "date": "2024-11-03"
}"#;

/// Renderer that only counts invocations.
struct CountingRenderer {
    calls: Mutex<usize>,
}

impl CountingRenderer {
    fn new() -> Self {
        Self {
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Renderer for CountingRenderer {
    fn render(&self, _series: &PlotSeries) -> Result<(), SessionError> {
        *self.calls.lock().unwrap() += 1;
        Ok(())
    }
}

/// Spawn a one-connection server that answers every request line with
/// `response` and returns the request lines it saw once the client hangs up.
async fn spawn_server(response: String) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut requests = Vec::new();

        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    requests.push(line.trim().to_string());
                    let body = response.replace('\n', " ");
                    if writer
                        .write_all(format!("{body}\n").as_bytes())
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
        requests
    });

    (port, handle)
}

#[tokio::test]
async fn test_malformed_response_is_surfaced_not_raised() {
    let (port, _handle) = spawn_server("this is not json".to_string()).await;

    let mut client = InferenceClient::connect("127.0.0.1", port).await.unwrap();
    let err = client
        .send(&SurveyResponse { performance: 5 })
        .await
        .unwrap_err();

    match err {
        ProtocolError::Malformed { raw } => assert_eq!(raw, "this is not json"),
        other => panic!("expected Malformed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_field_is_business_error() {
    let (port, _handle) = spawn_server(r#"{"error": "model offline"}"#.to_string()).await;

    let mut client = InferenceClient::connect("127.0.0.1", port).await.unwrap();
    let err = client
        .send(&SurveyResponse { performance: 5 })
        .await
        .unwrap_err();

    assert!(matches!(err, ProtocolError::Server(msg) if msg == "model offline"));
}

#[tokio::test]
async fn test_closed_connection_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        // Accept and immediately hang up
        let _ = listener.accept().await;
    });

    let mut client = InferenceClient::connect("127.0.0.1", port).await.unwrap();
    let err = client
        .send(&SurveyResponse { performance: 5 })
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(err, ProtocolError::Transport(_)));
}

#[tokio::test]
async fn test_well_formed_report_parses() {
    let (port, _handle) = spawn_server(REPORT_JSON.to_string()).await;

    let mut client = InferenceClient::connect("127.0.0.1", port).await.unwrap();
    let report = client
        .send(&SurveyResponse { performance: 10 })
        .await
        .unwrap();

    assert_eq!(report.prior_stats["skill"], vec![5.0, 1.0]);
    assert_eq!(report.posterior_stats["learning_rate"], vec![3.0, 1.0]);
    assert_eq!(report.date.as_deref(), Some("2024-11-03"));
}

#[tokio::test]
async fn test_single_session_end_to_end() {
    let (port, server) = spawn_server(REPORT_JSON.to_string()).await;

    // "10" answers the rating question, "no, thanks" declines another round
    let speech = ScriptedSpeech::new(["10", "no, thanks"]);
    // First completion extracts the rating, second writes the recommendation
    let completion = ScriptedCompletion::new(["10", "Your skill estimate moved up; keep going."]);
    let renderer = CountingRenderer::new();
    let config = CoachConfig::default();

    let client = InferenceClient::connect("127.0.0.1", port).await.unwrap();
    let controller = SessionController::new(client, &speech, &completion, &renderer, &config);

    controller.run().await.unwrap();

    // Exactly one full iteration reached the server, then the connection
    // was closed
    let requests = server.await.unwrap();
    assert_eq!(requests, vec![r#"{"performance":10}"#.to_string()]);

    // All three tracked variables were plotted
    assert_eq!(renderer.calls(), 3);

    let spoken = speech.spoken();
    assert!(spoken[0].starts_with("Hey stranger!"));
    assert!(spoken
        .iter()
        .any(|s| s == "Based on your input, here's an analysis of your progress."));
    assert!(spoken
        .iter()
        .any(|s| s == "Your skill estimate moved up; keep going."));
    assert!(spoken
        .iter()
        .any(|s| s.contains("add another session")));
}

#[tokio::test]
async fn test_server_error_keeps_controller_alive() {
    let (port, server) = spawn_server(r#"{"error": "inference timed out"}"#.to_string()).await;

    // The first round trip fails server-side and loops straight back to
    // collecting input; the second round's rating never resolves, which is
    // the only path out of a server that always errors.
    let speech = ScriptedSpeech::new(["8", "mumble", "mumble", "no"]);
    let completion = ScriptedCompletion::new(["8", "unclear", "unclear"]);
    let renderer = CountingRenderer::new();
    let mut config = CoachConfig::default();
    config.session.max_rating_attempts = 2;

    let client = InferenceClient::connect("127.0.0.1", port).await.unwrap();
    let controller = SessionController::new(client, &speech, &completion, &renderer, &config);

    controller.run().await.unwrap();

    let requests = server.await.unwrap();
    assert_eq!(requests, vec![r#"{"performance":8}"#.to_string()]);
    assert_eq!(renderer.calls(), 0);

    let spoken = speech.spoken();
    assert!(spoken
        .iter()
        .any(|s| s.contains("error communicating with the server")
            && s.contains("inference timed out")));
}

#[tokio::test]
async fn test_ambiguous_input_skips_to_continue_question() {
    let (port, server) = spawn_server(REPORT_JSON.to_string()).await;

    let speech = ScriptedSpeech::new(["banana", "kumquat", "no"]);
    let completion = ScriptedCompletion::new(["unclear", "unclear"]);
    let renderer = CountingRenderer::new();
    let mut config = CoachConfig::default();
    config.session.max_rating_attempts = 2;

    let client = InferenceClient::connect("127.0.0.1", port).await.unwrap();
    let controller = SessionController::new(client, &speech, &completion, &renderer, &config);

    controller.run().await.unwrap();

    // Nothing ever reached the server
    let requests = server.await.unwrap();
    assert!(requests.is_empty());

    let spoken = speech.spoken();
    assert!(spoken.iter().any(|s| s.contains("skip this session")));
    assert!(spoken.iter().any(|s| s.contains("add another session")));
}
