use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing API key for {provider_name}: {env_var} environment variable is not set")]
    MissingApiKey {
        provider_name: &'static str,
        env_var: &'static str,
    },

    #[error("Unknown provider '{0}', expected one of: openai, groq, grok, gemini")]
    Unknown(String),
}

/// OpenAI-compatible chat completion backends usable for summaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    Openai,
    Groq,
    Grok,
    Gemini,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Openai => ProviderConfig {
                api_url: "https://api.openai.com/v1/chat/completions",
                model: "gpt-4o-mini",
                env_var: "OPENAI_API_KEY",
            },
            Provider::Groq => ProviderConfig {
                api_url: "https://api.groq.com/openai/v1/chat/completions",
                model: "llama-3.1-8b-instant",
                env_var: "GROQ_API_KEY",
            },
            Provider::Grok => ProviderConfig {
                api_url: "https://api.x.ai/v1/chat/completions",
                model: "grok-4-fast",
                env_var: "XAI_API_KEY",
            },
            Provider::Gemini => ProviderConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                model: "gemini-2.5-flash",
                env_var: "GEMINI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Openai => "OpenAI",
            Provider::Groq => "Groq",
            Provider::Grok => "Grok",
            Provider::Gemini => "Gemini",
        }
    }

    /// Read this provider's API key from the environment. Meant to be called
    /// once at startup; the key is then injected into the summarizer.
    pub fn api_key_from_env(&self) -> Result<String, ProviderError> {
        let config = self.config();
        std::env::var(config.env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ProviderError::MissingApiKey {
                provider_name: self.name(),
                env_var: config.env_var,
            })
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::Openai),
            "groq" => Ok(Provider::Groq),
            "grok" | "xai" => Ok(Provider::Grok),
            "gemini" => Ok(Provider::Gemini),
            other => Err(ProviderError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_names_case_insensitively() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::Openai);
        assert_eq!("groq".parse::<Provider>().unwrap(), Provider::Groq);
        assert_eq!("xai".parse::<Provider>().unwrap(), Provider::Grok);
        assert!(matches!(
            "claude-ish".parse::<Provider>(),
            Err(ProviderError::Unknown(_))
        ));
    }

    #[test]
    fn every_provider_points_at_chat_completions() {
        for provider in [Provider::Openai, Provider::Groq, Provider::Grok, Provider::Gemini] {
            assert!(provider.config().api_url.ends_with("/chat/completions"));
        }
    }
}
