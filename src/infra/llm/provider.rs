use std::error::Error as StdError;

use tracing::warn;

use crate::domain::{
    ExtendProviderResult, GenerateProviderResult, GenerationRequest, ProviderError,
    ProviderErrorKind, ProviderName, StyleContext, sanitize_style,
};

use super::prompt_builder::BuiltPrompt;
use super::schema_validator::{SongPackDraft, SongPackValidator};

/// Capability shared by every LLM vendor integration.
pub trait SongProvider: Send + Sync {
    fn provider_name(&self) -> ProviderName;

    fn model_name(&self) -> &str;

    fn generate_pack(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerateProviderResult, ProviderError>;

    fn extend_lyrics(
        &self,
        current_lyrics: &str,
        topic: &str,
        style: &str,
        language: &str,
    ) -> Result<ExtendProviderResult, ProviderError>;
}

/// Runs a JSON-mode completion, retrying exactly once when the output is empty or
/// malformed. Vendor failures from `complete` propagate immediately.
pub(crate) fn complete_song_pack<F>(
    vendor_label: &str,
    provider: ProviderName,
    validator: &SongPackValidator,
    prompt: &BuiltPrompt,
    mut complete: F,
) -> Result<SongPackDraft, ProviderError>
where
    F: FnMut(&BuiltPrompt) -> Result<String, ProviderError>,
{
    let first_text = complete(prompt)?;
    let malformed = match validator.parse_text(&first_text) {
        Ok(draft) => return Ok(draft),
        Err(malformed) => malformed,
    };

    warn!(
        event = "provider_retry",
        provider = provider.as_str(),
        code = ProviderErrorKind::InvalidResponse.as_str(),
        "{vendor_label} output unusable ({malformed}), retrying with strict JSON reminder"
    );

    let retry_text = complete(&prompt.with_strict_json_reminder())?;
    validator.parse_text(&retry_text).map_err(|malformed| {
        ProviderError::invalid_response(format!(
            "{vendor_label} request failed after retries: {malformed}"
        ))
    })
}

pub(crate) fn finish_song_pack(
    provider: &dyn SongProvider,
    request: &GenerationRequest,
    draft: SongPackDraft,
) -> GenerateProviderResult {
    GenerateProviderResult {
        provider_name: provider.provider_name(),
        model_name: provider.model_name().to_string(),
        style: sanitize_style(&draft.style, &StyleContext::from_request(request)),
        title: draft.title,
        lyrics: draft.lyrics,
        explanation: draft.explanation,
    }
}

/// Maps a reqwest transport failure to a provider error.
///
/// The URL is dropped before any text is inspected: a port such as `:4010` would
/// otherwise match the `401` status token. Failures while sending the request or
/// reading the body are `NETWORK`; only the remaining cases go through `classify`.
pub(crate) fn map_transport_error(context: &str, error: reqwest::Error) -> ProviderError {
    let error = error.without_url();
    let detail = error_chain_text(&error);

    if error.is_timeout() {
        return ProviderError::new(
            ProviderErrorKind::Timeout,
            format!("{context}: request timed out: {detail}"),
        );
    }
    if error.is_connect() || error.is_request() || error.is_body() {
        return ProviderError::new(ProviderErrorKind::Network, format!("{context}: {detail}"));
    }

    ProviderError::classified(context, &detail)
}

fn error_chain_text(error: &dyn StdError) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !cause_text.is_empty() && !text.ends_with(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}
