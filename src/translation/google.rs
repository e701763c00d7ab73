//! Google Translate (`gtx` client) backend.
//!
//! The request is a GET with the source text URL-escaped into the query
//! string. The response is a nested JSON array whose first element is a list
//! of `[translated, original, ...]` segments; the translation is the
//! in-order concatenation of the translated parts.

use super::{TranslationBackend, TranslationError};
use crate::config::TranslationConfig;
use crate::types::{EngineId, TranslationRequest};
use tracing::{debug, trace};
use url::Url;

/// Google Translate client
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
    source_lang: String,
    target_lang: String,
}

impl GoogleTranslator {
    pub fn new(client: reqwest::Client, config: &TranslationConfig) -> Self {
        Self {
            client,
            endpoint: config.google_endpoint.clone(),
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
        }
    }

    /// Full request URL for `text`
    pub fn request_url(&self, text: &str) -> Result<Url, TranslationError> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("client", "gtx"),
                ("sl", self.source_lang.as_str()),
                ("tl", self.target_lang.as_str()),
                ("dt", "t"),
                ("q", text),
            ],
        )?;
        Ok(url)
    }
}

#[async_trait::async_trait]
impl TranslationBackend for GoogleTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        let url = self.request_url(request.source_text())?;
        trace!("GET {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(TranslationError::Status(response.status()));
        }

        let body = response.text().await?;
        Ok(parse_response(&body))
    }

    fn engine(&self) -> EngineId {
        EngineId::Google
    }
}

/// Extract the translation from a `translate_a/single` body.
///
/// Anything unparseable yields an empty string.
pub fn parse_response(body: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            debug!("Unparseable translation response: {}", e);
            return String::new();
        }
    };

    let Some(segments) = value.get(0).and_then(|s| s.as_array()) else {
        return String::new();
    };

    segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> GoogleTranslator {
        GoogleTranslator::new(reqwest::Client::new(), &TranslationConfig::default())
    }

    #[test]
    fn test_request_url_escapes_text() {
        let url = translator().request_url("你好 & bye").unwrap();
        assert_eq!(url.host_str(), Some("translate.googleapis.com"));
        assert_eq!(url.path(), "/translate_a/single");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client".into(), "gtx".into())));
        assert!(pairs.contains(&("sl".into(), "zh-CN".into())));
        assert!(pairs.contains(&("tl".into(), "en".into())));
        assert!(pairs.contains(&("q".into(), "你好 & bye".into())));
        assert!(!url.as_str().contains('你'));
    }

    #[test]
    fn test_parse_concatenates_segments() {
        let body = r#"[[["Hello, ","你好，",null,null,10],["world.","世界。",null,null,10]],null,"zh-CN"]"#;
        assert_eq!(parse_response(body), "Hello, world.");
    }

    #[test]
    fn test_parse_skips_segments_without_text() {
        let body = r#"[[["Hi",  "嗨"],[null,null,"Nǐ hǎo"]],null,"zh-CN"]"#;
        assert_eq!(parse_response(body), "Hi");
    }

    #[test]
    fn test_parse_failure_is_empty() {
        assert_eq!(parse_response("<html>rate limited</html>"), "");
        assert_eq!(parse_response("{}"), "");
        assert_eq!(parse_response("[null]"), "");
        assert_eq!(parse_response(""), "");
    }
}
