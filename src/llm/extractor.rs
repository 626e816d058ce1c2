

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::providers::base::{ChatMessage, ChatOptions, LlmProvider, LlmProviderError};


/// Entity list an extractor returns when it could not process the query.
pub const EXTRACTION_FAILURE_SENTINEL: &str = "error occurred";


lazy_static! {
    static ref JSON_OBJECT: Regex = Regex::new(r"(?s)\{.*\}").expect("valid regex");
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {

    pub entities: Vec<String>,

    /// Spelling or terminology corrections the extractor applied to the query.
    #[serde(default)]
    pub correction_context: Option<String>,
}

impl Extraction {

    pub fn failed() -> Self {
        Self {
            entities: vec![EXTRACTION_FAILURE_SENTINEL.to_string()],
            correction_context: None,
        }
    }

    /// Empty output and the sentinel both count as a failed extraction.
    pub fn is_failure(&self) -> bool {
        self.entities.is_empty()
            || (self.entities.len() == 1 && self.entities[0] == EXTRACTION_FAILURE_SENTINEL)
    }
}


#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Extraction, LlmProviderError>;
}


#[derive(Deserialize)]
struct ExtractorOutput {
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    corrections: Option<String>,
}


/// Pulls biomedical entity mentions out of a question with a chat model.
pub struct LlmEntityExtractor<P: LlmProvider> {
    provider: P,
}

impl<P: LlmProvider> LlmEntityExtractor<P> {

    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn system_prompt() -> &'static str {
        r#"You extract entities from clinical and scientific questions.

Return JSON with this structure:
{
  "entities": ["drug, condition, intervention, outcome or population mentioned in the question"],
  "corrections": "misspellings you corrected, or null"
}

Use the canonical name of each entity, lowercase unless it is an acronym. Do not invent entities that are not mentioned."#
    }

    /// Parses model output; tolerates prose around the JSON object.
    fn parse(response: &str) -> Option<Extraction> {
        let output = serde_json::from_str::<ExtractorOutput>(response).ok().or_else(|| {
            let object = JSON_OBJECT.find(response)?;
            serde_json::from_str::<ExtractorOutput>(object.as_str()).ok()
        })?;

        let entities: Vec<String> = output
            .entities
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();

        Some(Extraction {
            entities,
            correction_context: output.corrections.filter(|c| !c.trim().is_empty()),
        })
    }
}

#[async_trait]
impl<P: LlmProvider> EntityExtractor for LlmEntityExtractor<P> {
    async fn extract(&self, text: &str) -> Result<Extraction, LlmProviderError> {
        info!("Extracting entities from query: {}", crate::preview(text, 50));

        let messages = [
            ChatMessage::system(Self::system_prompt()),
            ChatMessage::user(format!("Question:\n\n{}", text)),
        ];

        let (response, _metadata) = match self.provider.chat(&messages, &ChatOptions::json()).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Entity extraction call failed: {}", e);
                return Ok(Extraction::failed());
            }
        };

        match Self::parse(&response) {
            Some(extraction) => {
                debug!("Extracted {} entities: {:?}", extraction.entities.len(), extraction.entities);
                Ok(extraction)
            }
            None => {
                warn!("Failed to parse extraction result: {}", crate::preview(&response, 120));
                Ok(Extraction::failed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::LlmMetadata;

    struct Canned(Result<String, String>);

    #[async_trait]
    impl LlmProvider for Canned {
        async fn chat(
            &self,
            _: &[ChatMessage],
            _: &ChatOptions,
        ) -> Result<(String, LlmMetadata), LlmProviderError> {
            self.0
                .clone()
                .map(|content| (content, LlmMetadata::default()))
                .map_err(LlmProviderError::Provider)
        }

        fn provider_name(&self) -> &str {
            "canned"
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_failure_detection() {
        assert!(Extraction::failed().is_failure());
        assert!(Extraction::default().is_failure());
        let ok = Extraction {
            entities: vec!["delirium".into()],
            correction_context: None,
        };
        assert!(!ok.is_failure());
    }

    #[tokio::test]
    async fn test_extracts_entities_from_json() {
        let extractor = LlmEntityExtractor::new(Canned(Ok(
            r#"{"entities": ["dexmedetomidine", " delirium ", ""], "corrections": null}"#.to_string(),
        )));

        let extraction = extractor.extract("What is the effect of dexmedetomidine on delirium?").await.unwrap();
        assert_eq!(extraction.entities, vec!["dexmedetomidine", "delirium"]);
        assert!(extraction.correction_context.is_none());
    }

    #[tokio::test]
    async fn test_recovers_json_wrapped_in_prose() {
        let extractor = LlmEntityExtractor::new(Canned(Ok(
            "Sure! {\"entities\": [\"septic shock\"], \"corrections\": \"sceptic -> septic\"} Hope that helps.".to_string(),
        )));

        let extraction = extractor.extract("sceptic shock steroids").await.unwrap();
        assert_eq!(extraction.entities, vec!["septic shock"]);
        assert_eq!(extraction.correction_context.as_deref(), Some("sceptic -> septic"));
    }

    #[tokio::test]
    async fn test_provider_failure_yields_sentinel() {
        let extractor = LlmEntityExtractor::new(Canned(Err("timeout".to_string())));
        let extraction = extractor.extract("anything").await.unwrap();
        assert_eq!(extraction.entities, vec![EXTRACTION_FAILURE_SENTINEL]);
        assert!(extraction.is_failure());
    }
}
