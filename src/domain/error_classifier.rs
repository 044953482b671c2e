//! Maps raw vendor failure text onto the provider error taxonomy.
//!
//! Matching is case-insensitive substring search, checked in priority order; the
//! first rule with a hit wins. Token lists are externally observable through the
//! HTTP status codes they drive, so they must stay stable.

use super::ProviderErrorKind;

const CLASSIFICATION_RULES: &[(ProviderErrorKind, &[&str])] = &[
    (
        ProviderErrorKind::Auth,
        &["unauthorized", "invalid api key", "authentication", "401"],
    ),
    (
        ProviderErrorKind::Quota,
        &["insufficient", "quota", "credits exhausted", "billing", "402"],
    ),
    (
        ProviderErrorKind::RateLimit,
        &["rate limit", "too many requests", "429"],
    ),
    (
        ProviderErrorKind::Timeout,
        &["timeout", "timed out", "deadline exceeded"],
    ),
    (
        ProviderErrorKind::Network,
        &["connection", "network", "dns", "temporary", "502", "503", "504"],
    ),
];

pub fn classify(text: &str) -> (ProviderErrorKind, bool) {
    let lowered = text.to_lowercase();
    let kind = CLASSIFICATION_RULES
        .iter()
        .find(|(_, tokens)| tokens.iter().any(|token| lowered.contains(token)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ProviderErrorKind::Unknown);

    (kind, kind.is_retryable())
}
