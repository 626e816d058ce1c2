

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, error, warn};

use super::providers::base::ChatMessage;
use crate::core::error::RetrievalError;
use crate::retrieval::models::{ChunkRecord, CompositeContext};


/// Named system-prompt templates. Lookups never fail; unknown names give `""`.
pub trait TemplateStore: Send + Sync {
    fn template(&self, name: &str) -> String;
}


#[derive(Debug, Default, Deserialize)]
struct TemplateEntry {
    #[serde(default)]
    system: String,
}


/// Templates from a YAML file shaped as `name: { system: "..." }`.
#[derive(Debug, Default)]
pub struct YamlTemplateStore {
    templates: HashMap<String, TemplateEntry>,
}

impl YamlTemplateStore {

    /// A document that is not a mapping is an error; a single malformed entry
    /// is skipped with a warning and the rest still load.
    pub fn from_yaml(yaml: &str) -> Result<Self, RetrievalError> {
        let entries: serde_yaml::Mapping =
            serde_yaml::from_str(yaml).map_err(|e| RetrievalError::TemplateLoad(e.to_string()))?;

        let mut templates = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            let Some(name) = key.as_str() else {
                warn!("Skipping prompt template with non-string name: {:?}", key);
                continue;
            };
            match serde_yaml::from_value::<TemplateEntry>(value) {
                Ok(entry) => {
                    templates.insert(name.to_string(), entry);
                }
                Err(e) => warn!("Skipping malformed prompt template {}: {}", name, e),
            }
        }

        debug!("Loaded {} prompt templates", templates.len());
        Ok(Self { templates })
    }


    pub fn load(path: impl AsRef<Path>) -> Result<Self, RetrievalError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| RetrievalError::TemplateLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
    }

    /// Like [`load`](Self::load), but an unreadable file gives an empty store.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            error!("Error loading prompt templates: {}", e);
            Self::default()
        })
    }


    pub fn len(&self) -> usize {
        self.templates.len()
    }


    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateStore for YamlTemplateStore {
    fn template(&self, name: &str) -> String {
        self.templates.get(name).map(|t| t.system.clone()).unwrap_or_default()
    }
}


/// Builds the message set sent to the completion service.
pub struct PromptAssembler;

impl PromptAssembler {

    /// System prompt with query and context, then the lead chunks of every
    /// cited document, then the question itself as the user turn.
    pub fn assemble(
        system_template: &str,
        query: &str,
        context: &CompositeContext,
        chunks: &[ChunkRecord],
    ) -> Vec<ChatMessage> {
        let prompt = format!("{}\n\nUser Query: {}\nContext: {}\n", system_template, query, context);
        let chunk_listing = serde_json::to_string(chunks).unwrap_or_else(|_| "[]".to_string());

        vec![
            ChatMessage::system(prompt),
            ChatMessage::system(chunk_listing),
            ChatMessage::user(query),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::ChatRole;
    use crate::retrieval::models::ChunkMetadata;
    use std::io::Write;

    const PROMPTS: &str = r#"
stance_synthesis:
  system: "Classify each paper as supporting, opposing or neutral."
document_retrieval:
  system: "List the documents relevant to the question."
empty_entry: {}
"#;

    #[test]
    fn test_template_lookup() {
        let store = YamlTemplateStore::from_yaml(PROMPTS).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.template("stance_synthesis"), "Classify each paper as supporting, opposing or neutral.");
        assert_eq!(store.template("empty_entry"), "");
        assert_eq!(store.template("medical_synthesis"), "");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PROMPTS.as_bytes()).unwrap();

        let store = YamlTemplateStore::load(file.path()).unwrap();
        assert!(store.template("document_retrieval").starts_with("List the documents"));
    }

    #[test]
    fn test_missing_file_is_empty_not_fatal() {
        let err = YamlTemplateStore::load("/nonexistent/sysprompts.yaml").unwrap_err();
        assert!(matches!(err, RetrievalError::TemplateLoad(_)));

        let store = YamlTemplateStore::load_or_empty("/nonexistent/sysprompts.yaml");
        assert!(store.is_empty());
        assert_eq!(store.template("stance_synthesis"), "");
    }

    #[test]
    fn test_malformed_yaml_is_template_load_error() {
        let err = YamlTemplateStore::from_yaml("stance_synthesis: [unclosed").unwrap_err();
        assert!(matches!(err, RetrievalError::TemplateLoad(_)));
    }

    #[test]
    fn test_malformed_entry_keeps_valid_templates() {
        let yaml = r#"
foo: bar
stance_synthesis:
  system: "Classify each paper."
document_retrieval:
  system: [not, a, string]
"#;
        let store = YamlTemplateStore::from_yaml(yaml).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.template("stance_synthesis"), "Classify each paper.");
        assert_eq!(store.template("foo"), "");
        assert_eq!(store.template("document_retrieval"), "");

        let err = YamlTemplateStore::from_yaml("- stance_synthesis\n- document_retrieval\n").unwrap_err();
        assert!(matches!(err, RetrievalError::TemplateLoad(_)));
    }

    #[test]
    fn test_assemble_messages() {
        let chunks = vec![ChunkRecord {
            filename: "ROSE".to_string(),
            chunk_text: vec!["Early neuromuscular blockade".to_string()],
            metadata: ChunkMetadata {
                positions: vec![5],
                pages: vec![2],
            },
        }];
        let context = CompositeContext::from("Query: q\nFound 0 unique relationships:\n");

        let messages = PromptAssembler::assemble("Be precise.", "Does cisatracurium help?", &context, &chunks);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.starts_with("Be precise.\n\nUser Query: Does cisatracurium help?\nContext: Query: q"));
        assert!(messages[1].content.contains("\"filename\":\"ROSE\""));
        assert_eq!(messages[2], ChatMessage::user("Does cisatracurium help?"));
    }
}
