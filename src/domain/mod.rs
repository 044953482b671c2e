mod error_classifier;
mod errors;
mod song_contract;
mod style_sanitizer;

pub use error_classifier::classify;
pub use errors::{ProviderError, ProviderErrorKind, ValidationError};
pub use song_contract::{
    ExtendProviderResult, ExtendRequest, ExtendResponse, GenerateProviderResult,
    GenerateResponse, GenerationRequest, ProviderName, ProvidersResponse, SongStructure,
};
pub use style_sanitizer::{FIDELITY_TOKENS, MAX_STYLE_CHARS, StyleContext, sanitize_style};
