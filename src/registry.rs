use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{chat::ChatProvider, error::LLMError};

/// Model selector value that dispatches to every registered provider.
pub const ALL_MODELS: &str = "all";

/// Display name reported for provider ids missing from the lookup table.
pub const UNKNOWN_PROVIDER: &str = "Unknown";

/// Identifier of a registered provider, e.g. `gpt-3.5-turbo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Result<Self, LLMError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(LLMError::InvalidRequest(
                "Provider id cannot be empty".to_string(),
            ));
        }
        if id.chars().any(char::is_control) {
            return Err(LLMError::InvalidRequest(format!(
                "Provider id {id:?} contains control characters"
            )));
        }
        if id == ALL_MODELS {
            return Err(LLMError::InvalidRequest(format!(
                "Provider id '{ALL_MODELS}' is reserved"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ProviderId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One streaming adapter together with the name it is reported under.
#[derive(Clone)]
pub struct ProviderEntry {
    pub id: ProviderId,
    pub name: String,
    pub provider: Arc<dyn ChatProvider>,
}

/// Lookup table of chat adapters keyed by provider id.
///
/// Registration order is kept and used as the dispatch order in all-models
/// mode, so the table behaves the same across runs.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
    index: HashMap<ProviderId, usize>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a provider under an identifier, replacing any previous one.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        provider: Arc<dyn ChatProvider>,
    ) -> Result<(), LLMError> {
        let id = ProviderId::new(id)?;
        let entry = ProviderEntry {
            id: id.clone(),
            name: name.into(),
            provider,
        };
        match self.index.get(&id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(id, self.entries.len());
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Retrieves a provider by its identifier.
    pub fn get(&self, id: &str) -> Option<&ProviderEntry> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    /// Display name for a provider id, `"Unknown"` when it is not registered.
    pub fn provider_name(&self, id: &str) -> &str {
        self.get(id)
            .map(|entry| entry.name.as_str())
            .unwrap_or(UNKNOWN_PROVIDER)
    }

    /// All entries in registration order.
    pub fn entries(&self) -> &[ProviderEntry] {
        &self.entries
    }

    pub fn ids(&self) -> impl Iterator<Item = &ProviderId> {
        self.entries.iter().map(|entry| &entry.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::chat::{ChatMessage, ChatResponse};

    struct Silent;

    #[async_trait]
    impl ChatProvider for Silent {
        async fn chat(&self, _messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
            Err(LLMError::Generic("unused".to_string()))
        }
    }

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for (id, name) in [
            ("mixtral-8x7b-32768", "Groq"),
            ("gpt-3.5-turbo", "OpenAI"),
            ("gemini-1.5-flash", "Gemini"),
        ] {
            registry.insert(id, name, Arc::new(Silent)).unwrap();
        }
        registry
    }

    #[test]
    fn keeps_registration_order() {
        let registry = registry();
        let ids: Vec<&str> = registry.ids().map(ProviderId::as_str).collect();
        assert_eq!(ids, vec!["mixtral-8x7b-32768", "gpt-3.5-turbo", "gemini-1.5-flash"]);
    }

    #[test]
    fn unknown_ids_map_to_unknown_name() {
        let registry = registry();
        assert_eq!(registry.provider_name("gpt-3.5-turbo"), "OpenAI");
        assert_eq!(registry.provider_name("llama-3"), UNKNOWN_PROVIDER);
    }

    #[test]
    fn rejects_empty_and_reserved_ids() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.insert("  ", "x", Arc::new(Silent)).is_err());
        assert!(registry.insert("all", "x", Arc::new(Silent)).is_err());
        assert!(registry.insert("gpt\u{1e}4", "x", Arc::new(Silent)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut registry = registry();
        registry
            .insert("gpt-3.5-turbo", "OpenAI (proxy)", Arc::new(Silent))
            .unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.entries()[1].name, "OpenAI (proxy)");
    }
}
