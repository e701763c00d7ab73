//! DeepL REST API backend (requires an API key)

use super::{TranslationBackend, TranslationError};
use crate::config::TranslationConfig;
use crate::types::{EngineId, TranslationRequest};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    #[serde(default)]
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}

pub struct DeepLTranslator {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    source_lang: String,
    target_lang: String,
}

impl DeepLTranslator {
    pub fn new(client: reqwest::Client, api_key: &str, config: &TranslationConfig) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            endpoint: config.deepl_endpoint.clone(),
            source_lang: deepl_lang(&config.source_lang),
            target_lang: deepl_lang(&config.target_lang),
        }
    }
}

/// DeepL wants bare upper-case language codes (`zh-CN` -> `ZH`)
fn deepl_lang(code: &str) -> String {
    code.split('-').next().unwrap_or(code).to_uppercase()
}

#[async_trait::async_trait]
impl TranslationBackend for DeepLTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&[
                ("text", request.source_text()),
                ("source_lang", self.source_lang.as_str()),
                ("target_lang", self.target_lang.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TranslationError::Status(response.status()));
        }

        // A body we cannot read counts as an empty translation
        let body = response.text().await?;
        let parsed: Option<DeepLResponse> = serde_json::from_str(&body).ok();
        Ok(parsed
            .map(|r| {
                r.translations
                    .into_iter()
                    .map(|t| t.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }

    fn engine(&self) -> EngineId {
        EngineId::DeepL
    }
}
