use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::domain::{ProviderError, ProviderName, ProvidersResponse};

use super::{GeminiProvider, OpenAiProvider, SongProvider};

/// Read-only map from provider name to adapter, plus the normalized routing preferences.
///
/// Built once at startup; shared across requests behind an `Arc` without locking.
#[derive(Clone)]
pub struct ProviderRouter {
    providers: HashMap<ProviderName, Arc<dyn SongProvider>>,
    default_provider: ProviderName,
    auto_order: Vec<ProviderName>,
}

impl ProviderRouter {
    pub fn new(default_provider: &str, auto_provider_order: &str) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: normalize_default_provider(default_provider),
            auto_order: normalize_auto_order(auto_provider_order),
        }
    }

    /// Registers an adapter for every provider whose API key is present.
    pub fn from_settings(settings: &Settings) -> Result<Self, ProviderError> {
        let mut router = Self::new(&settings.default_provider, &settings.auto_provider_order);

        if let Some(api_key) = settings.gemini.configured_api_key() {
            router.register(GeminiProvider::with_config(
                api_key,
                settings.gemini.base_url.as_str(),
                settings.gemini.model.as_str(),
                settings.gemini.timeout,
            )?)?;
        }
        if let Some(api_key) = settings.openai.configured_api_key() {
            router.register(OpenAiProvider::with_config(
                api_key,
                settings.openai.base_url.as_str(),
                settings.openai.model.as_str(),
                settings.openai.timeout,
            )?)?;
        }

        info!(
            configured = ?router.configured(),
            default_provider = router.default_provider.as_str(),
            auto_order = ?router.auto_order,
            "provider router ready"
        );
        Ok(router)
    }

    pub fn register<P>(&mut self, provider: P) -> Result<(), ProviderError>
    where
        P: SongProvider + 'static,
    {
        self.register_shared(Arc::new(provider))
    }

    pub fn register_shared(
        &mut self,
        provider: Arc<dyn SongProvider>,
    ) -> Result<(), ProviderError> {
        let name = provider.provider_name();
        if name.is_auto() {
            return Err(ProviderError::configuration(
                "provider 'auto' cannot be registered",
            ));
        }
        if self.providers.contains_key(&name) {
            return Err(ProviderError::configuration(format!(
                "provider '{name}' is already registered"
            )));
        }

        self.providers.insert(name, provider);
        Ok(())
    }

    /// Configured providers in canonical order.
    pub fn configured(&self) -> Vec<ProviderName> {
        ProviderName::CONCRETE
            .into_iter()
            .filter(|name| self.providers.contains_key(name))
            .collect()
    }

    pub fn auto_order(&self) -> &[ProviderName] {
        &self.auto_order
    }

    pub fn default_provider(&self) -> ProviderName {
        self.default_provider
    }

    /// Providers to try for a request, in order.
    pub fn resolve_order(&self, requested: ProviderName) -> Vec<ProviderName> {
        if requested.is_auto() {
            self.auto_order.clone()
        } else {
            vec![requested]
        }
    }

    pub fn get_provider(
        &self,
        name: ProviderName,
    ) -> Result<Arc<dyn SongProvider>, ProviderError> {
        if name.is_auto() {
            return Err(ProviderError::configuration(
                "Cannot resolve provider for auto directly",
            ));
        }

        self.providers
            .get(&name)
            .cloned()
            .ok_or_else(|| {
                ProviderError::configuration(format!("Provider '{name}' is not configured"))
            })
    }

    pub fn providers_summary(&self) -> ProvidersResponse {
        ProvidersResponse {
            configured: self.configured(),
            default_provider: self.default_provider,
            auto_order: self.auto_order.clone(),
        }
    }
}

fn normalize_default_provider(value: &str) -> ProviderName {
    value.parse().unwrap_or(ProviderName::Auto)
}

/// Recognized names from `value` first, then the canonical tail; each provider once.
///
/// Items are trimmed but otherwise matched exactly, so `OpenAI` is not `openai`.
fn normalize_auto_order(value: &str) -> Vec<ProviderName> {
    let preferred = value.split(',').filter_map(|item| match item.trim() {
        "gemini" => Some(ProviderName::Gemini),
        "openai" => Some(ProviderName::OpenAi),
        _ => None,
    });

    let mut order = Vec::with_capacity(ProviderName::CONCRETE.len());
    for name in preferred.chain(ProviderName::CONCRETE) {
        if !order.contains(&name) {
            order.push(name);
        }
    }
    order
}
