//! HTTP classifier adapter tests
//!
//! A wiremock server stands in for the verdict service, so request shape
//! and response decoding are checked without the real classifier.

use base64::Engine;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wmp_common::config::ClassifierConfig;
use wmp_wf::classifier::{ClassifierError, ClassifierTask, HttpClassifier, Payload, Verdict, VerdictClassifier};

fn client(server: &MockServer) -> HttpClassifier {
    HttpClassifier::new(&ClassifierConfig {
        base_url: format!("{}/classify", server.uri()),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_image_is_posted_base64_to_task_path() {
    let server = MockServer::start().await;
    let image = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
    let encoded = base64::engine::general_purpose::STANDARD.encode(&image);

    Mock::given(method("POST"))
        .and(path("/classify/cleanliness"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "image": encoded })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "verdict": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let verdict = client(&server)
        .classify(ClassifierTask::Cleanliness, Payload::Image(image))
        .await
        .unwrap();

    assert_eq!(verdict, Verdict::UNCLEAN);
}

#[tokio::test]
async fn test_text_payload_and_plain_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/classify/manhole-issue"))
        .and(body_json(json!({ "text": "cover missing" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("2,0.91"))
        .mount(&server)
        .await;

    let verdict = client(&server)
        .classify(ClassifierTask::ManholeIssue, Payload::Text("cover missing".to_string()))
        .await
        .unwrap();

    assert_eq!(verdict, Verdict(2));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/classify/manhole-fixed"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = client(&server)
        .classify(ClassifierTask::ManholeFixed, Payload::Image(vec![1]))
        .await;

    match result {
        Err(ClassifierError::Status(code, body)) => {
            assert_eq!(code, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_garbage_body_is_unparseable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/classify/cleanliness"))
        .respond_with(ResponseTemplate::new(200).set_body_string("looks clean to me"))
        .mount(&server)
        .await;

    let result = client(&server)
        .classify(ClassifierTask::Cleanliness, Payload::Image(vec![1]))
        .await;

    assert!(matches!(result, Err(ClassifierError::Unparseable(_))));
}

#[tokio::test]
async fn test_unreachable_service() {
    // Reserve a port, then free it so nothing is listening
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let classifier = HttpClassifier::new(&ClassifierConfig {
        base_url: format!("http://127.0.0.1:{}/classify", port),
        timeout_secs: 2,
    })
    .unwrap();

    let result = classifier
        .classify(ClassifierTask::Cleanliness, Payload::Image(vec![1]))
        .await;

    assert!(matches!(result, Err(ClassifierError::Unavailable(_))));
}
