use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;

const MAX_TOPIC_CHARS: usize = 500;
const MAX_PERCENT: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    #[default]
    Auto,
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderName {
    /// Concrete providers, in canonical order.
    pub const CONCRETE: [ProviderName; 2] = [ProviderName::Gemini, ProviderName::OpenAi];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    pub fn is_auto(self) -> bool {
        self == Self::Auto
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(ValidationError::new(format!(
                "unknown provider '{other}' (expected one of: auto, gemini, openai)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SongStructure {
    #[default]
    Auto,
    Standard,
    Pop,
    Rap,
    Ambient,
    Custom,
}

impl SongStructure {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Standard => "Standard",
            Self::Pop => "Pop",
            Self::Rap => "Rap",
            Self::Ambient => "Ambient",
            Self::Custom => "Custom",
        }
    }
}

impl fmt::Display for SongStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_voice() -> String {
    "Any".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default)]
    pub tempo: String,
    #[serde(default)]
    pub structure: SongStructure,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub is_instrumental: bool,
    #[serde(default)]
    pub provider: ProviderName,
    #[serde(default)]
    pub weirdness: Option<u8>,
    #[serde(default)]
    pub style_influence: Option<u8>,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            genre: String::new(),
            mood: String::new(),
            voice: default_voice(),
            tempo: String::new(),
            structure: SongStructure::Auto,
            language: default_language(),
            is_instrumental: false,
            provider: ProviderName::Auto,
            weirdness: None,
            style_influence: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_topic(&self.topic)?;
        validate_percent("weirdness", self.weirdness)?;
        validate_percent("styleInfluence", self.style_influence)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendRequest {
    pub current_lyrics: String,
    pub topic: String,
    #[serde(default)]
    pub style: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub provider: ProviderName,
}

impl ExtendRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.current_lyrics.trim().is_empty() {
            return Err(ValidationError::new("currentLyrics must not be empty"));
        }
        validate_topic(&self.topic)
    }
}

fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    if topic.trim().is_empty() {
        return Err(ValidationError::new("topic must not be empty"));
    }
    let length = topic.chars().count();
    if length > MAX_TOPIC_CHARS {
        return Err(ValidationError::new(format!(
            "topic must be at most {MAX_TOPIC_CHARS} characters (got {length})"
        )));
    }
    Ok(())
}

fn validate_percent(field: &str, value: Option<u8>) -> Result<(), ValidationError> {
    if let Some(value) = value
        && value > MAX_PERCENT
    {
        return Err(ValidationError::new(format!(
            "{field} must be in 0..={MAX_PERCENT} (got {value})"
        )));
    }
    Ok(())
}

/// Output of a successful generate call, tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateProviderResult {
    pub provider_name: ProviderName,
    pub model_name: String,
    pub title: String,
    pub style: String,
    pub lyrics: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendProviderResult {
    pub provider_name: ProviderName,
    pub model_name: String,
    /// New section text only.
    pub added_lyrics: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub title: String,
    pub style: String,
    pub lyrics: String,
    pub explanation: String,
    pub provider_used: ProviderName,
    pub model_used: String,
}

impl From<GenerateProviderResult> for GenerateResponse {
    fn from(result: GenerateProviderResult) -> Self {
        Self {
            title: result.title,
            style: result.style,
            lyrics: result.lyrics,
            explanation: result.explanation,
            provider_used: result.provider_name,
            model_used: result.model_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendResponse {
    pub added_lyrics: String,
    pub provider_used: ProviderName,
    pub model_used: String,
}

impl From<ExtendProviderResult> for ExtendResponse {
    fn from(result: ExtendProviderResult) -> Self {
        Self {
            added_lyrics: result.added_lyrics,
            provider_used: result.provider_name,
            model_used: result.model_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersResponse {
    pub configured: Vec<ProviderName>,
    pub default_provider: ProviderName,
    pub auto_order: Vec<ProviderName>,
}
