pub mod gemini;
pub mod openai;
mod prompt_builder;
mod provider;
mod provider_router;
mod response_parsing;
pub mod schema_validator;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use prompt_builder::{BuiltPrompt, PromptBuilder, structure_plan};
pub use provider::SongProvider;
pub use provider_router::ProviderRouter;
