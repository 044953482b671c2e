use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderErrorKind {
    Configuration,
    Auth,
    Quota,
    RateLimit,
    Timeout,
    Network,
    InvalidResponse,
    Unknown,
}

impl ProviderErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "CONFIGURATION",
            Self::Auth => "AUTH",
            Self::Quota => "QUOTA",
            Self::RateLimit => "RATE_LIMIT",
            Self::Timeout => "TIMEOUT",
            Self::Network => "NETWORK",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Timeout | Self::Network | Self::InvalidResponse
        )
    }

    /// Status returned when a caller pinned a single provider and it failed with this kind.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Auth => 401,
            Self::Quota => 402,
            Self::RateLimit => 429,
            Self::InvalidResponse => 502,
            Self::Configuration | Self::Timeout | Self::Network | Self::Unknown => 503,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::Configuration => {
                "Provider is not configured on the server. Set its API key and restart."
            }
            Self::Auth => "Authentication failed. Check your provider API key and configuration.",
            Self::Quota => "Provider quota or credits are exhausted. Check billing for this provider.",
            Self::RateLimit => "The provider is rate limiting requests. Please retry in a moment.",
            Self::Timeout => "The provider did not respond in time. Please retry.",
            Self::Network => "Could not reach the provider service. Please retry.",
            Self::InvalidResponse => "The provider returned an invalid response format.",
            Self::Unknown => "The provider request failed unexpectedly.",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised at the provider boundary.
///
/// `retryable` is always derived from `kind`, so the pair can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Configuration, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidResponse, message)
    }

    /// Builds an error from raw vendor failure text using the substring classifier.
    pub fn classified(context: &str, raw: &str) -> Self {
        let (kind, _) = super::classify(raw);
        Self::new(kind, format!("{context}: {raw}"))
    }

    pub fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
