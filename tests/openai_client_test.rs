mod common;

use httpmock::prelude::*;
use sec_digest::adapters::OpenAiClient;
use sec_digest::domain::ports::{ChatRequest, LlmClient};
use sec_digest::utils::error::DigestError;
use serde_json::json;

fn request(max_tokens: Option<u32>) -> ChatRequest {
    ChatRequest {
        model: "gpt-4o-mini".to_string(),
        prompt: "hello".to_string(),
        temperature: 0.0,
        max_tokens,
    }
}

#[tokio::test]
async fn test_chat_completion_round_trip() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .header("authorization", "Bearer test-key")
            .json_body(json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hello"}],
                "temperature": 0.0,
                "max_tokens": 1200
            }));
        then.status(200).json_body(json!({
            "choices": [{"message": {"role": "assistant", "content": "안녕하세요"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }));
    });

    let config = common::test_config(&server.base_url(), "unused");
    let client = OpenAiClient::new(&config.openai).unwrap();
    let completion = client.complete(&request(Some(1200))).await.unwrap();

    mock.assert();
    assert_eq!(completion.content, "안녕하세요");
    assert_eq!(completion.prompt_tokens, Some(12));
    assert_eq!(completion.completion_tokens, Some(4));
}

#[tokio::test]
async fn test_usage_is_optional() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .json_body(json!({"choices": [{"message": {"content": "ok"}}]}));
    });

    let config = common::test_config(&server.base_url(), "unused");
    let completion = OpenAiClient::new(&config.openai)
        .unwrap()
        .complete(&request(None))
        .await
        .unwrap();
    assert_eq!(completion.content, "ok");
    assert_eq!(completion.prompt_tokens, None);
}

#[tokio::test]
async fn test_rate_limit_status_is_kept() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(429).body("Rate limit reached");
    });

    let config = common::test_config(&server.base_url(), "unused");
    let err = OpenAiClient::new(&config.openai)
        .unwrap()
        .complete(&request(None))
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_missing_api_key_fails_on_use() {
    let mut config = common::test_config("http://127.0.0.1:9", "unused");
    config.openai.api_key = None;

    let client = OpenAiClient::new(&config.openai).unwrap();
    let err = client.complete(&request(None)).await.unwrap_err();
    assert!(matches!(err, DigestError::MissingConfigError { .. }));
}
