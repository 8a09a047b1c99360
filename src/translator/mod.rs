mod client;
mod error;
mod provider;

pub use client::TranslationClient;
pub use error::TranslateError;
pub use provider::{GroqProvider, ProviderFactory, TranslationProvider, TranslationRequest};
