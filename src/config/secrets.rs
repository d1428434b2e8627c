use std::fmt;

use secrecy::SecretString;

/// API keys read from the environment.
#[derive(Default)]
pub struct Secrets {
    pub openai: Option<SecretString>,
    pub groq: Option<SecretString>,
    pub gemini: Option<SecretString>,
    pub pinecone: Option<SecretString>,
    /// Bearer token clients must present, when set
    pub server_api_key: Option<SecretString>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds secrets from any variable lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::new)
        };
        Self {
            openai: read("OPENAI_API_KEY"),
            groq: read("GROQ_API_KEY"),
            gemini: read("GEMINI_API_KEY"),
            pinecone: read("PINECONE_API_KEY"),
            server_api_key: read("LLM_EVALUATOR_API_KEY"),
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |s: &Option<SecretString>| if s.is_some() { "set" } else { "unset" };
        f.debug_struct("Secrets")
            .field("openai", &state(&self.openai))
            .field("groq", &state(&self.groq))
            .field("gemini", &state(&self.gemini))
            .field("pinecone", &state(&self.pinecone))
            .field("server_api_key", &state(&self.server_api_key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn blank_values_are_unset_and_debug_hides_keys() {
        let env = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("GROQ_API_KEY", "  "),
        ]);
        let secrets = Secrets::from_lookup(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(secrets.openai.as_ref().unwrap().expose_secret(), "sk-test");
        assert!(secrets.groq.is_none());
        assert!(secrets.gemini.is_none());
        let debug = format!("{secrets:?}");
        assert!(!debug.contains("sk-test"));
        assert!(debug.contains("openai: \"set\""));
    }
}
