use std::io::Read;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;
use songforge::domain::{GenerationRequest, ProviderErrorKind, ProviderName};
use songforge::infra::llm::{GeminiProvider, OpenAiProvider, SongProvider};

const GEMINI_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";
const OPENAI_PATH: &str = "/v1/chat/completions";

// The first attempt's user prompt ends with the section tag guidance; the retry
// ends with the strict JSON reminder.
const FIRST_ATTEMPT_BODY: &str = r#"\[Outro\]\.""#;
const RETRY_ATTEMPT_BODY: &str = r#"no trailing text\.""#;

fn song_pack_json() -> String {
    json!({
        "title": "Neon Rain",
        "style": "Synthwave, analog synth, gated drums, male vocals, nostalgic",
        "lyrics": "[Verse]\nCity lights in the rain",
        "explanation": "Retro night drive"
    })
    .to_string()
}

fn request() -> GenerationRequest {
    let mut request = GenerationRequest::new("Night drive");
    request.genre = "Synthwave".to_string();
    request
}

fn gemini_body(text: &str) -> String {
    json!({
        "candidates": [
            { "content": { "role": "model", "parts": [ { "text": text } ] } }
        ]
    })
    .to_string()
}

fn openai_body(text: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": text } }
        ]
    })
    .to_string()
}

fn gemini(base_url: &str) -> GeminiProvider {
    GeminiProvider::with_config(
        "test-key",
        base_url,
        "gemini-2.0-flash",
        Duration::from_secs(5),
    )
    .expect("provider should build")
}

fn openai(base_url: &str) -> OpenAiProvider {
    OpenAiProvider::with_config("test-key", base_url, "gpt-4.1-mini", Duration::from_secs(5))
        .expect("provider should build")
}

#[test]
fn gemini_generate_succeeds_through_http_mock() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", GEMINI_PATH)
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::Regex(
            "\"responseMimeType\"\\s*:\\s*\"application/json\"".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(gemini_body(&song_pack_json()))
        .create();

    let result = gemini(&server.url())
        .generate_pack(&request())
        .expect("mocked gemini response should parse");

    mock.assert();
    assert_eq!(result.provider_name, ProviderName::Gemini);
    assert_eq!(result.model_name, "gemini-2.0-flash");
    assert_eq!(result.title, "Neon Rain");
    assert_eq!(result.lyrics, "[Verse]\nCity lights in the rain");
    assert!(result.style.chars().count() <= 200);
    for token in ["44.1kHz", "Wide Stereo", "Clean Mix"] {
        assert!(result.style.contains(token), "missing {token} in {}", result.style);
    }
}

#[test]
fn openai_generate_succeeds_through_http_mock() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", OPENAI_PATH)
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("\"model\"\\s*:\\s*\"gpt-4.1-mini\"".to_string()),
            Matcher::Regex("\"json_object\"".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openai_body(&format!("```json\n{}\n```", song_pack_json())))
        .create();

    let result = openai(&server.url())
        .generate_pack(&request())
        .expect("mocked openai response should parse");

    mock.assert();
    assert_eq!(result.provider_name, ProviderName::OpenAi);
    assert_eq!(result.model_name, "gpt-4.1-mini");
    assert_eq!(result.title, "Neon Rain");
    assert!(result.style.contains("Clean Mix"));
}

#[test]
fn openai_base_url_with_v1_suffix_is_not_duplicated() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", OPENAI_PATH)
        .with_status(200)
        .with_body(openai_body(&song_pack_json()))
        .create();

    openai(&format!("{}/v1", server.url()))
        .generate_pack(&request())
        .expect("mocked openai response should parse");

    mock.assert();
}

#[test]
fn gemini_retries_once_after_malformed_output() {
    let mut server = Server::new();
    let first = server
        .mock("POST", GEMINI_PATH)
        .match_body(Matcher::Regex(FIRST_ATTEMPT_BODY.to_string()))
        .with_status(200)
        .with_body(gemini_body("{}"))
        .expect(1)
        .create();
    let retry = server
        .mock("POST", GEMINI_PATH)
        .match_body(Matcher::Regex(RETRY_ATTEMPT_BODY.to_string()))
        .with_status(200)
        .with_body(gemini_body(&song_pack_json()))
        .expect(1)
        .create();

    let result = gemini(&server.url())
        .generate_pack(&request())
        .expect("retry should recover");

    first.assert();
    retry.assert();
    assert_eq!(result.title, "Neon Rain");
}

#[test]
fn openai_fails_with_invalid_response_after_second_malformed_output() {
    let mut server = Server::new();
    let first = server
        .mock("POST", OPENAI_PATH)
        .match_body(Matcher::Regex(FIRST_ATTEMPT_BODY.to_string()))
        .with_status(200)
        .with_body(openai_body("Sure! Here is a song about driving at night."))
        .expect(1)
        .create();
    let retry = server
        .mock("POST", OPENAI_PATH)
        .match_body(Matcher::Regex(RETRY_ATTEMPT_BODY.to_string()))
        .with_status(200)
        .with_body(openai_body(""))
        .expect(1)
        .create();

    let error = openai(&server.url())
        .generate_pack(&request())
        .expect_err("two malformed answers should fail");

    first.assert();
    retry.assert();
    assert_eq!(error.kind(), ProviderErrorKind::InvalidResponse);
    assert!(error.is_retryable());
    assert!(
        error
            .message()
            .starts_with("OpenAI request failed after retries:")
    );
}

#[test]
fn gemini_rate_limit_is_classified_without_retry() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", GEMINI_PATH)
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error":{"code":429,"message":"Too many requests, slow down","status":"UNAVAILABLE"}}"#,
        )
        .expect(1)
        .create();

    let error = gemini(&server.url())
        .generate_pack(&request())
        .expect_err("429 should surface");

    mock.assert();
    assert_eq!(error.kind(), ProviderErrorKind::RateLimit);
    assert!(error.is_retryable());
    assert!(error.message().starts_with("Gemini request failed: 429"));
}

#[test]
fn openai_unauthorized_is_classified_as_auth() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", OPENAI_PATH)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#,
        )
        .expect(1)
        .create();

    let error = openai(&server.url())
        .generate_pack(&request())
        .expect_err("401 should surface");

    mock.assert();
    assert_eq!(error.kind(), ProviderErrorKind::Auth);
    assert!(!error.is_retryable());
    assert_eq!(
        error.user_message(),
        "Authentication failed. Check your provider API key and configuration."
    );
}

#[test]
fn openai_quota_exhaustion_is_classified_as_quota() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", OPENAI_PATH)
        .with_status(429)
        .with_body(
            r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#,
        )
        .create();

    let error = openai(&server.url())
        .extend_lyrics("[Verse]\nHello", "Night drive", "Synthwave", "English")
        .expect_err("quota failure should surface");

    assert_eq!(error.kind(), ProviderErrorKind::Quota);
    assert!(error.message().starts_with("OpenAI extend failed: 429"));
}

#[test]
fn extend_returns_trimmed_plain_text() {
    let mut server = Server::new();
    let gemini_mock = server
        .mock("POST", GEMINI_PATH)
        .match_body(Matcher::Regex("Current lyrics:".to_string()))
        .with_status(200)
        .with_body(gemini_body("\n[Bridge]\nNew horizon\n  "))
        .create();
    let openai_mock = server
        .mock("POST", OPENAI_PATH)
        .with_status(200)
        .with_body(openai_body("  [Outro]\nFade away\n"))
        .create();

    let gemini_result = gemini(&server.url())
        .extend_lyrics("[Verse]\nHello", "Night drive", "", "English")
        .expect("gemini extend should succeed");
    let openai_result = openai(&server.url())
        .extend_lyrics("[Verse]\nHello", "Night drive", "", "English")
        .expect("openai extend should succeed");

    gemini_mock.assert();
    openai_mock.assert();
    assert_eq!(gemini_result.added_lyrics, "[Bridge]\nNew horizon");
    assert_eq!(gemini_result.provider_name, ProviderName::Gemini);
    assert_eq!(openai_result.added_lyrics, "[Outro]\nFade away");
    assert_eq!(openai_result.model_name, "gpt-4.1-mini");
}

#[test]
fn extend_does_not_request_json_mode() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", OPENAI_PATH)
        .match_body(Matcher::Regex("response_format".to_string()))
        .with_status(500)
        .expect(0)
        .create();
    let _fallback = server
        .mock("POST", OPENAI_PATH)
        .with_status(200)
        .with_body(openai_body("[Bridge]\nOk"))
        .create();

    openai(&server.url())
        .extend_lyrics("[Verse]\nHello", "Night drive", "", "English")
        .expect("extend should succeed");

    mock.assert();
}

#[test]
fn unreachable_host_is_classified_as_network() {
    let error = openai("http://127.0.0.1:1")
        .generate_pack(&request())
        .expect_err("connection should fail");

    assert_eq!(error.kind(), ProviderErrorKind::Network);
    assert!(error.is_retryable());
}

/// Accepts a single connection, reads part of the request, then hangs up without
/// answering. Prefers a port whose digits contain `401`.
fn hang_up_after_accept() -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:4010")
        .or_else(|_| TcpListener::bind("127.0.0.1:0"))
        .expect("listener should bind");
    let address = listener.local_addr().expect("listener address");
    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buffer = [0_u8; 1024];
            let _ = stream.read(&mut buffer);
        }
    });
    (format!("http://{address}"), handle)
}

#[test]
fn openai_dropped_connection_is_network_even_with_status_like_port() {
    let (base_url, handle) = hang_up_after_accept();

    let error = openai(&base_url)
        .extend_lyrics("[Verse]\nHello", "Night drive", "Synthwave", "English")
        .expect_err("dropped connection should fail");
    handle.join().expect("listener thread");

    assert_eq!(error.kind(), ProviderErrorKind::Network);
    assert!(error.is_retryable());
    assert!(!error.message().contains("http://"), "{}", error.message());
}

#[test]
fn gemini_dropped_connection_is_network() {
    let (base_url, handle) = hang_up_after_accept();

    let error = gemini(&base_url)
        .extend_lyrics("[Verse]\nHello", "Night drive", "Synthwave", "English")
        .expect_err("dropped connection should fail");
    handle.join().expect("listener thread");

    assert_eq!(error.kind(), ProviderErrorKind::Network);
    assert!(error.is_retryable());
    assert!(!error.message().contains("http://"), "{}", error.message());
}
