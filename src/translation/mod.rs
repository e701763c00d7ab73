//! Translation backends.
//!
//! This module provides the two engines the panel offers:
//! - Google: the public `translate_a/single` endpoint (client `gtx`)
//! - DeepL: the DeepL REST API, or Google when no API key is configured

pub mod deepl;
pub mod google;

use crate::config::TranslationConfig;
use crate::types::{EngineId, TranslationRequest, TranslationResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub use deepl::DeepLTranslator;
pub use google::GoogleTranslator;

/// Errors from a translation call
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid endpoint: {0}")]
    Url(#[from] url::ParseError),

    #[error("Backend returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("No backend for engine {0}")]
    NoBackend(EngineId),
}

/// Trait for translation engines
#[async_trait::async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate the request text. An `Ok` with an empty string means the
    /// backend answered but produced nothing usable.
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError>;

    /// Get the engine this backend serves
    fn engine(&self) -> EngineId;
}

/// Run one request and fold any error into a [`TranslationResult`]
pub async fn run_translation(
    backend: &dyn TranslationBackend,
    request: &TranslationRequest,
) -> TranslationResult {
    match backend.translate(request).await {
        Ok(text) => {
            debug!(
                "{} translated {} chars into {} chars",
                request.engine(),
                request.source_text().chars().count(),
                text.chars().count()
            );
            TranslationResult::Translated(text)
        }
        Err(e) => {
            warn!("{} translation failed: {}", request.engine(), e);
            TranslationResult::Failed(e.to_string())
        }
    }
}

/// Dispatches requests to the backend registered for their engine
pub struct EngineRouter {
    backends: HashMap<EngineId, Arc<dyn TranslationBackend>>,
}

impl EngineRouter {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Build the standard engine set from configuration
    pub fn from_config(config: &TranslationConfig) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        let google = Arc::new(GoogleTranslator::new(client.clone(), config));
        let mut router = Self::new();
        router.register(google.clone());

        match config.deepl_api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => router.register(Arc::new(DeepLTranslator::new(client, key, config))),
            None => {
                debug!("No DeepL API key configured, DeepL requests use the Google endpoint");
                router.register_as(EngineId::DeepL, google);
            }
        }
        Ok(router)
    }

    pub fn register(&mut self, backend: Arc<dyn TranslationBackend>) {
        self.backends.insert(backend.engine(), backend);
    }

    /// Serve `engine` with a backend built for another engine
    pub fn register_as(&mut self, engine: EngineId, backend: Arc<dyn TranslationBackend>) {
        self.backends.insert(engine, backend);
    }

    pub fn has_engine(&self, engine: EngineId) -> bool {
        self.backends.contains_key(&engine)
    }
}

impl Default for EngineRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TranslationBackend for EngineRouter {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        let backend = self
            .backends
            .get(&request.engine())
            .ok_or(TranslationError::NoBackend(request.engine()))?;
        backend.translate(request).await
    }

    fn engine(&self) -> EngineId {
        EngineId::Google
    }
}
