use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{
    ExtendRequest, ExtendResponse, GenerateResponse, GenerationRequest, ProviderError,
    ProviderErrorKind, ProviderName, ValidationError,
};
use crate::infra::llm::{ProviderRouter, SongProvider};

const UNPROCESSABLE_STATUS: u16 = 422;
const UNAVAILABLE_STATUS: u16 = 503;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongOperation {
    Generate,
    Extend,
}

impl SongOperation {
    fn exhausted_summary(self) -> &'static str {
        match self {
            Self::Generate => "No available provider could generate content.",
            Self::Extend => "No available provider could extend lyrics.",
        }
    }
}

/// One failed attempt within a request's fallback sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: ProviderName,
    pub error: ProviderError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (retryable={}) {}",
            self.provider,
            self.error.kind(),
            self.error.is_retryable(),
            self.error.user_message()
        )
    }
}

/// Request-scoped failure; carries everything the HTTP layer needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SongServiceError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{} {}", .failure.provider, .failure.error)]
    ProviderFailed { failure: ProviderFailure },
    #[error("{} {}", .operation.exhausted_summary(), join_failures(.failures))]
    NoProviderAvailable {
        operation: SongOperation,
        failures: Vec<ProviderFailure>,
    },
}

impl SongServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => UNPROCESSABLE_STATUS,
            Self::ProviderFailed { failure } => failure.error.kind().http_status(),
            Self::NoProviderAvailable { .. } => UNAVAILABLE_STATUS,
        }
    }

    /// Client-facing reason. Raw vendor text never leaves the server through here.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(error) => error.message().to_string(),
            Self::ProviderFailed { failure } => {
                format!(
                    "{} (provider: {})",
                    failure.error.user_message(),
                    failure.provider
                )
            }
            Self::NoProviderAvailable {
                operation,
                failures,
            } => format!(
                "{} {}",
                operation.exhausted_summary(),
                join_failures(failures)
            ),
        }
    }

    pub fn kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::ProviderFailed { failure } => Some(failure.error.kind()),
            Self::Validation(_) | Self::NoProviderAvailable { .. } => None,
        }
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Tries providers sequentially in routed order and returns the first success.
#[derive(Clone)]
pub struct SongService {
    router: Arc<ProviderRouter>,
}

impl SongService {
    pub fn new(router: Arc<ProviderRouter>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    pub fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerateResponse, SongServiceError> {
        request.validate()?;

        let result =
            self.run_with_fallback(request.provider, SongOperation::Generate, |provider| {
                provider.generate_pack(request)
            })?;
        Ok(GenerateResponse::from(result))
    }

    pub fn extend(&self, request: &ExtendRequest) -> Result<ExtendResponse, SongServiceError> {
        request.validate()?;

        let result = self.run_with_fallback(request.provider, SongOperation::Extend, |provider| {
            provider.extend_lyrics(
                &request.current_lyrics,
                &request.topic,
                &request.style,
                &request.language,
            )
        })?;
        Ok(ExtendResponse::from(result))
    }

    fn run_with_fallback<T, F>(
        &self,
        requested: ProviderName,
        operation: SongOperation,
        mut attempt: F,
    ) -> Result<T, SongServiceError>
    where
        F: FnMut(&dyn SongProvider) -> Result<T, ProviderError>,
    {
        let mut failures = Vec::new();

        for provider_name in self.router.resolve_order(requested) {
            let outcome = self
                .router
                .get_provider(provider_name)
                .and_then(|provider| attempt(provider.as_ref()));

            match outcome {
                Ok(value) => {
                    info!(
                        event = "provider_succeeded",
                        provider = provider_name.as_str(),
                        "provider call succeeded"
                    );
                    return Ok(value);
                }
                Err(error) => {
                    warn!(
                        event = "provider_failed",
                        provider = provider_name.as_str(),
                        code = error.kind().as_str(),
                        retryable = error.is_retryable(),
                        "provider call failed: {error}"
                    );
                    failures.push(ProviderFailure {
                        provider: provider_name,
                        error,
                    });
                }
            }
        }

        if !requested.is_auto()
            && let Some(failure) = failures.pop()
        {
            return Err(SongServiceError::ProviderFailed { failure });
        }

        Err(SongServiceError::NoProviderAvailable {
            operation,
            failures,
        })
    }
}
