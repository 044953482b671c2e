use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::{
    ExtendProviderResult, GenerateProviderResult, GenerationRequest, ProviderError, ProviderName,
};

use super::prompt_builder::{BuiltPrompt, PromptBuilder};
use super::provider::{SongProvider, complete_song_pack, finish_song_pack, map_transport_error};
use super::response_parsing::{trimmed_non_blank, clip_vendor_message};
use super::schema_validator::SongPackValidator;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

const VENDOR_LABEL: &str = "OpenAI";
const GENERATE_CONTEXT: &str = "OpenAI request failed";
const EXTEND_CONTEXT: &str = "OpenAI extend failed";

pub struct OpenAiProvider {
    api_key: String,
    api_base_url: String,
    model_name: String,
    client: Client,
    validator: SongPackValidator,
}

impl OpenAiProvider {
    pub fn with_config(
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        model_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::configuration(
                "OpenAI API key must not be empty",
            ));
        }

        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(ProviderError::configuration(
                "OpenAI API base URL must not be empty",
            ));
        }

        let model_name = model_name.into().trim().to_string();
        if model_name.is_empty() {
            return Err(ProviderError::configuration(
                "OpenAI model name must not be empty",
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            ProviderError::configuration(format!("failed to create OpenAI HTTP client: {err}"))
        })?;
        let validator = SongPackValidator::new()?;

        Ok(Self {
            api_key,
            api_base_url,
            model_name,
            client,
            validator,
        })
    }

    fn endpoint_url(&self) -> String {
        build_v1_url(&self.api_base_url, "chat/completions")
    }

    fn build_request_payload(
        &self,
        prompt: &BuiltPrompt,
        json_mode: bool,
    ) -> OpenAiChatCompletionsRequest {
        OpenAiChatCompletionsRequest {
            model: self.model_name.clone(),
            messages: vec![
                OpenAiChatMessageRequest {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                OpenAiChatMessageRequest {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            response_format: json_mode.then(|| OpenAiResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }

    /// Sends one chat completion and returns the assistant text (empty when absent).
    fn complete(
        &self,
        prompt: &BuiltPrompt,
        json_mode: bool,
        context: &str,
    ) -> Result<String, ProviderError> {
        let payload = self.build_request_payload(prompt, json_mode);
        let started = Instant::now();

        let response = self
            .client
            .post(self.endpoint_url())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .map_err(|err| map_transport_error(context, err))?;

        let status = response.status();
        let response_body = response
            .text()
            .map_err(|err| map_transport_error(context, err))?;
        if !status.is_success() {
            return Err(map_http_error(context, status, &response_body));
        }

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            provider = ProviderName::OpenAi.as_str(),
            duration_ms, "OpenAI completion returned"
        );

        extract_response_text(&response_body)
    }
}

impl SongProvider for OpenAiProvider {
    fn provider_name(&self) -> ProviderName {
        ProviderName::OpenAi
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn generate_pack(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerateProviderResult, ProviderError> {
        let prompt = PromptBuilder::build_generation(request);
        let draft = complete_song_pack(
            VENDOR_LABEL,
            ProviderName::OpenAi,
            &self.validator,
            &prompt,
            |prompt| self.complete(prompt, true, GENERATE_CONTEXT),
        )?;
        Ok(finish_song_pack(self, request, draft))
    }

    fn extend_lyrics(
        &self,
        current_lyrics: &str,
        topic: &str,
        style: &str,
        language: &str,
    ) -> Result<ExtendProviderResult, ProviderError> {
        let prompt = PromptBuilder::build_extend(current_lyrics, topic, style, language);
        let text = self.complete(&prompt, false, EXTEND_CONTEXT)?;

        Ok(ExtendProviderResult {
            provider_name: ProviderName::OpenAi,
            model_name: self.model_name.clone(),
            added_lyrics: text.trim().to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct OpenAiChatCompletionsRequest {
    model: String,
    messages: Vec<OpenAiChatMessageRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAiChatMessageRequest {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    message: Option<OpenAiChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

impl OpenAiChoice {
    fn extract_text(&self) -> Option<String> {
        if let Some(text) = self.text.as_deref().and_then(trimmed_non_blank) {
            return Some(text);
        }

        let content = self.message.as_ref()?.content.as_ref()?;
        extract_message_content(content)
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    #[serde(default)]
    error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

fn extract_response_text(response_body: &str) -> Result<String, ProviderError> {
    let response: OpenAiChatCompletionsResponse = serde_json::from_str(response_body)
        .map_err(|err| {
            ProviderError::invalid_response(format!("OpenAI response decode failed: {err}"))
        })?;

    Ok(response
        .choices
        .iter()
        .find_map(OpenAiChoice::extract_text)
        .unwrap_or_default())
}

fn extract_message_content(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => trimmed_non_blank(text),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(extract_content_part_text)
                .collect::<String>();
            trimmed_non_blank(&joined)
        }
        _ => None,
    }
}

fn extract_content_part_text(part: &Value) -> Option<String> {
    match part {
        Value::String(text) => Some(text.to_string()),
        Value::Object(map) => map
            .get("text")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        _ => None,
    }
}

/// Renders the HTTP failure as the text an SDK exception would carry, then classifies it.
fn map_http_error(context: &str, status: StatusCode, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<OpenAiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error);

    let mut raw = status.to_string();
    if let Some(detail) = detail.as_ref() {
        for tag in [detail.error_type.as_deref(), detail.code.as_deref()]
            .into_iter()
            .flatten()
        {
            raw.push(' ');
            raw.push_str(tag);
        }
    }

    let message = detail
        .map(|detail| detail.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| clip_vendor_message(body));
    if !message.is_empty() {
        raw.push_str(": ");
        raw.push_str(&clip_vendor_message(&message));
    }

    ProviderError::classified(context, &raw)
}

fn build_v1_url(api_base_url: &str, endpoint_path: &str) -> String {
    let base = api_base_url.trim_end_matches('/');
    let endpoint_path = endpoint_path.trim_start_matches('/');

    if base.ends_with("/v1") {
        format!("{base}/{endpoint_path}")
    } else {
        format!("{base}/v1/{endpoint_path}")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::{OpenAiProvider, build_v1_url, extract_response_text, map_http_error};
    use crate::domain::{GenerationRequest, ProviderErrorKind};
    use crate::infra::llm::PromptBuilder;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::with_config(
            "test-key",
            "https://api.openai.com",
            "gpt-4.1-mini",
            Duration::from_secs(2),
        )
        .expect("provider should build")
    }

    #[test]
    fn build_request_payload_requests_json_mode_only_for_generation() {
        let request = GenerationRequest::new("Night drive");
        let prompt = PromptBuilder::build_generation(&request);

        let json_payload = provider().build_request_payload(&prompt, true);
        let text_payload = provider().build_request_payload(&prompt, false);

        assert_eq!(json_payload.model, "gpt-4.1-mini");
        assert_eq!(json_payload.messages.len(), 2);
        assert_eq!(json_payload.messages[0].role, "system");
        assert_eq!(json_payload.messages[0].content, prompt.system);
        assert_eq!(json_payload.messages[1].role, "user");
        assert_eq!(json_payload.messages[1].content, prompt.user);
        assert_eq!(
            json_payload
                .response_format
                .as_ref()
                .map(|format| format.format_type.as_str()),
            Some("json_object")
        );
        assert!(text_payload.response_format.is_none());

        let serialized =
            serde_json::to_value(&text_payload).expect("payload should serialize");
        assert!(serialized.get("response_format").is_none());
    }

    #[test]
    fn extract_response_text_accepts_string_and_part_arrays() {
        let plain = r#"{"choices":[{"message":{"content":"  {\"title\":\"A\"}  "}}]}"#;
        let parts = r#"{"choices":[{"message":{"content":[{"type":"text","text":"{\"title\":"},{"type":"text","text":"\"B\"}"}]}}]}"#;

        assert_eq!(
            extract_response_text(plain).expect("plain content should parse"),
            "{\"title\":\"A\"}"
        );
        assert_eq!(
            extract_response_text(parts).expect("array content should parse"),
            "{\"title\":\"B\"}"
        );
    }

    #[test]
    fn extract_response_text_is_empty_when_no_choice_has_content() {
        let body = r#"{"choices":[{"message":{"content":null}}]}"#;

        assert_eq!(
            extract_response_text(body).expect("envelope should parse"),
            ""
        );
    }

    #[test]
    fn extract_response_text_rejects_undecodable_envelope() {
        let error = extract_response_text("<html>").expect_err("HTML body should fail");

        assert_eq!(error.kind(), ProviderErrorKind::InvalidResponse);
    }

    #[test]
    fn map_http_error_classifies_vendor_status_and_codes() {
        let auth = map_http_error(
            "OpenAI request failed",
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"type":"invalid_request_error","code":"invalid_api_key","message":"Incorrect API key provided"}}"#,
        );
        let quota = map_http_error(
            "OpenAI request failed",
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"type":"insufficient_quota","code":"insufficient_quota","message":"You exceeded your current quota"}}"#,
        );
        let rate_limited = map_http_error(
            "OpenAI request failed",
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"type":"requests","code":"rate_limit_exceeded","message":"Slow down"}}"#,
        );
        let unavailable = map_http_error(
            "OpenAI request failed",
            StatusCode::SERVICE_UNAVAILABLE,
            "upstream overloaded",
        );
        let unknown = map_http_error(
            "OpenAI request failed",
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Unsupported parameter"}}"#,
        );

        assert_eq!(auth.kind(), ProviderErrorKind::Auth);
        assert_eq!(quota.kind(), ProviderErrorKind::Quota);
        assert_eq!(rate_limited.kind(), ProviderErrorKind::RateLimit);
        assert_eq!(unavailable.kind(), ProviderErrorKind::Network);
        assert_eq!(unknown.kind(), ProviderErrorKind::Unknown);
        assert_eq!(
            unknown.message(),
            "OpenAI request failed: 400 Bad Request: Unsupported parameter"
        );
    }

    #[test]
    fn with_config_rejects_blank_settings() {
        let missing_key = OpenAiProvider::with_config(
            " ",
            "https://api.openai.com",
            "gpt-4.1-mini",
            Duration::from_secs(2),
        );
        let missing_model = OpenAiProvider::with_config(
            "test-key",
            "https://api.openai.com",
            "",
            Duration::from_secs(2),
        );

        assert!(matches!(
            missing_key,
            Err(error) if error.kind() == ProviderErrorKind::Configuration
        ));
        assert!(matches!(
            missing_model,
            Err(error) if error.message() == "OpenAI model name must not be empty"
        ));
    }

    #[test]
    fn build_v1_url_appends_v1_when_base_has_no_version_segment() {
        let url = build_v1_url("https://api.openai.com", "chat/completions");
        assert_eq!(url, "https://api.openai.com/v1/chat/completions");

        let url = build_v1_url("https://api.openai.com/", "/chat/completions");
        assert_eq!(url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn build_v1_url_avoids_duplicate_v1_when_base_already_has_v1() {
        let url = build_v1_url("https://example.com/v1/", "chat/completions");
        assert_eq!(url, "https://example.com/v1/chat/completions");
    }
}
