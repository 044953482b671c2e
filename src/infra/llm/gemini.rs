use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    ExtendProviderResult, GenerateProviderResult, GenerationRequest, ProviderError, ProviderName,
};

use super::prompt_builder::{BuiltPrompt, PromptBuilder};
use super::provider::{SongProvider, complete_song_pack, finish_song_pack, map_transport_error};
use super::response_parsing::clip_vendor_message;
use super::schema_validator::SongPackValidator;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const VENDOR_LABEL: &str = "Gemini";
const GENERATE_CONTEXT: &str = "Gemini request failed";
const EXTEND_CONTEXT: &str = "Gemini extend failed";
const JSON_MIME_TYPE: &str = "application/json";

pub struct GeminiProvider {
    api_key: String,
    api_base_url: String,
    model_name: String,
    client: Client,
    validator: SongPackValidator,
}

impl GeminiProvider {
    pub fn with_config(
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        model_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::configuration(
                "Gemini API key must not be empty",
            ));
        }

        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(ProviderError::configuration(
                "Gemini API base URL must not be empty",
            ));
        }

        let model_name = model_name.into().trim().to_string();
        if model_name.is_empty() {
            return Err(ProviderError::configuration(
                "Gemini model name must not be empty",
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            ProviderError::configuration(format!("failed to create Gemini HTTP client: {err}"))
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
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base_url.trim_end_matches('/'),
            self.model_name
        )
    }

    fn build_request_payload(
        &self,
        prompt: &BuiltPrompt,
        json_mode: bool,
    ) -> GeminiGenerateContentRequest {
        GeminiGenerateContentRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(prompt.system.clone()),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.user.clone()),
                }],
            }],
            generation_config: json_mode.then(|| GeminiGenerationConfig {
                response_mime_type: JSON_MIME_TYPE.to_string(),
            }),
        }
    }

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
            .header("x-goog-api-key", &self.api_key)
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
            provider = ProviderName::Gemini.as_str(),
            duration_ms, "Gemini completion returned"
        );

        extract_response_text(&response_body)
    }
}

impl SongProvider for GeminiProvider {
    fn provider_name(&self) -> ProviderName {
        ProviderName::Gemini
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
            ProviderName::Gemini,
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
            provider_name: ProviderName::Gemini,
            model_name: self.model_name.clone(),
            added_lyrics: text.trim().to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateContentRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiGenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    #[serde(default)]
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn extract_response_text(response_body: &str) -> Result<String, ProviderError> {
    let response: GeminiGenerateContentResponse = serde_json::from_str(response_body)
        .map_err(|err| {
            ProviderError::invalid_response(format!("Gemini response decode failed: {err}"))
        })?;

    let text = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}

fn map_http_error(context: &str, status: StatusCode, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error);

    let mut raw = status.to_string();
    if let Some(vendor_status) = detail.as_ref().and_then(|detail| detail.status.as_deref()) {
        raw.push(' ');
        raw.push_str(vendor_status);
    }

    let message = detail
        .map(|detail| detail.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| body.to_string());
    let message = clip_vendor_message(&message);
    if !message.is_empty() {
        raw.push_str(": ");
        raw.push_str(&message);
    }

    ProviderError::classified(context, &raw)
}
