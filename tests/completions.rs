//! OpenAI-compatible client behavior against a mock HTTP endpoint.

use httpmock::prelude::*;
use serde_json::json;

use copydesk::completions::{
    CompletionClient, CompletionError, CompletionOptions, OpenAiClient, OpenAiConfig,
};

fn client_for(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(OpenAiConfig {
        api_key: "test-key".into(),
        model: "test-model".into(),
        base_url: server.base_url(),
    })
}

#[tokio::test]
async fn sends_messages_and_returns_first_choice() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer test-key")
                .json_body_partial(
                    r#"{
                        "model": "test-model",
                        "messages": [
                            {"role": "system", "content": "sys"},
                            {"role": "user", "content": "edit this"}
                        ]
                    }"#,
                );
            then.status(200).json_body(json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "edited text"}}
                ]
            }));
        })
        .await;

    let client = client_for(&server);
    let text = client
        .complete("sys", "edit this", &CompletionOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "edited text");
    mock.assert_async().await;
}

#[tokio::test]
async fn options_override_model_and_sampling() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions").json_body_partial(
                r#"{"model": "override", "temperature": 0.2, "max_tokens": 512}"#,
            );
            then.status(200).json_body(json!({
                "choices": [{"message": {"content": "ok"}}]
            }));
        })
        .await;

    let client = client_for(&server);
    let options = CompletionOptions {
        model: Some("override".into()),
        ..CompletionOptions::default()
    }
    .with_temperature(0.2)
    .with_max_tokens(512);
    client.complete("sys", "user", &options).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn api_errors_carry_status_and_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(429).body("rate limited");
        })
        .await;

    let client = client_for(&server);
    let err = client
        .complete("sys", "user", &CompletionOptions::default())
        .await
        .unwrap_err();
    match err {
        CompletionError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_are_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({"choices": []}));
        })
        .await;

    let client = client_for(&server);
    let err = client
        .complete("sys", "user", &CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CompletionError::EmptyResponse));
}
