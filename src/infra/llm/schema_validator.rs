use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::ProviderError;

use super::response_parsing::json_object_text;

pub const SONG_PACK_JSON_SCHEMA: &str = r#"
{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "properties": {
    "title": { "type": "string" },
    "style": { "type": "string" },
    "lyrics": { "type": "string" },
    "explanation": { "type": "string" }
  }
}
"#;

/// Why a model's text could not be used as a song pack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedOutput {
    #[error("response was empty")]
    Empty,
    #[error("response was an empty JSON object")]
    EmptyObject,
    #[error("response did not include a JSON object")]
    NoJsonObject,
    #[error("response JSON decode failed: {0}")]
    Decode(String),
    #[error("response schema validation failed: {0}")]
    Schema(String),
}

/// Song pack fields as returned by a model, with missing keys already defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SongPackDraft {
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub lyrics: String,
    #[serde(default)]
    pub explanation: String,
}

fn untitled() -> String {
    "Untitled".to_string()
}

pub struct SongPackValidator {
    compiled_schema: JSONSchema,
}

impl SongPackValidator {
    pub fn new() -> Result<Self, ProviderError> {
        let schema: Value = serde_json::from_str(SONG_PACK_JSON_SCHEMA).map_err(|err| {
            ProviderError::configuration(format!("invalid built-in song pack schema: {err}"))
        })?;
        let compiled_schema = JSONSchema::compile(&schema).map_err(|err| {
            ProviderError::configuration(format!("failed to compile song pack schema: {err}"))
        })?;
        Ok(Self { compiled_schema })
    }

    pub fn parse_text(&self, text: &str) -> Result<SongPackDraft, MalformedOutput> {
        if text.trim().is_empty() {
            return Err(MalformedOutput::Empty);
        }
        let payload = json_object_text(text).ok_or(MalformedOutput::NoJsonObject)?;
        let value: Value = serde_json::from_str(payload)
            .map_err(|err| MalformedOutput::Decode(err.to_string()))?;
        self.parse_value(value)
    }

    pub fn parse_value(&self, value: Value) -> Result<SongPackDraft, MalformedOutput> {
        self.compiled_schema
            .validate(&value)
            .map_err(schema_validation_error)?;

        if value.as_object().is_some_and(|object| object.is_empty()) {
            return Err(MalformedOutput::EmptyObject);
        }

        serde_json::from_value(value).map_err(|err| MalformedOutput::Decode(err.to_string()))
    }
}

fn schema_validation_error<'a, I>(errors: I) -> MalformedOutput
where
    I: IntoIterator<Item = jsonschema::ValidationError<'a>>,
{
    let details = errors
        .into_iter()
        .map(|err| err.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    MalformedOutput::Schema(details)
}
