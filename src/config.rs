use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Overrides the built-in default query when set.
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub unattended: bool,

    #[serde(default = "default_output_file")]
    pub output_file: String,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub image: ImageConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    /// "openai" or "ollama"
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    pub openai: Option<OpenAILlmConfig>,
    pub ollama: Option<OllamaConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAILlmConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageConfig {
    /// Only "openai" is supported for now.
    #[serde(default = "default_image_provider")]
    pub provider: String,
    pub openai: Option<OpenAIImageConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIImageConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_image_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_image_size")]
    pub size: String,
    #[serde(default = "default_image_quality")]
    pub quality: String,
}

fn default_output_file() -> String {
    "output.png".to_string()
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4".to_string()
}
fn default_temperature() -> f32 {
    1.0
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_image_provider() -> String {
    "openai".to_string()
}
fn default_image_model() -> String {
    "dall-e-3".to_string()
}
fn default_image_size() -> String {
    "1024x1024".to_string()
}
fn default_image_quality() -> String {
    "standard".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query: None,
            unattended: false,
            output_file: default_output_file(),
            llm: LlmConfig::default(),
            image: ImageConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            openai: None,
            ollama: None,
        }
    }
}

impl Default for OpenAILlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_llm_model(),
            base_url: None,
            temperature: default_temperature(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            provider: default_image_provider(),
            openai: None,
        }
    }
}

impl Default for OpenAIImageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_image_model(),
            base_url: None,
            size: default_image_size(),
            quality: default_image_quality(),
        }
    }
}

impl Config {
    /// Reads config.yml from the working directory. The file is optional;
    /// defaults cover a run with only OPENAI_API_KEY in the environment.
    pub fn load() -> Result<Self> {
        let path = Path::new("config.yml");
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config.yml")?;
        let config: Config =
            serde_yaml_ng::from_str(&content).context("Failed to parse config.yml")?;
        Ok(config)
    }

    /// Fills missing OpenAI API keys from OPENAI_API_KEY and fails fast when
    /// an OpenAI-backed provider ends up without a credential.
    pub fn resolve_credentials(&mut self) -> Result<()> {
        let env_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        self.apply_api_key(env_key)
    }

    fn apply_api_key(&mut self, env_key: Option<String>) -> Result<()> {
        if self.llm.provider == "openai" {
            let cfg = self.llm.openai.get_or_insert_with(Default::default);
            if cfg.api_key.is_none() {
                cfg.api_key = env_key.clone();
            }
            if cfg.api_key.is_none() {
                bail!(
                    "missing credential: set llm.openai.api_key in config.yml \
                    or the OPENAI_API_KEY environment variable"
                );
            }
        }

        if self.image.provider == "openai" {
            let cfg = self.image.openai.get_or_insert_with(Default::default);
            if cfg.api_key.is_none() {
                cfg.api_key = env_key;
            }
            if cfg.api_key.is_none() {
                bail!(
                    "missing credential: set image.openai.api_key in config.yml \
                    or the OPENAI_API_KEY environment variable"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_fields_absent() {
        let config: Config = serde_yaml_ng::from_str("llm:\n  provider: ollama\n").unwrap();

        assert_eq!(config.output_file, "output.png");
        assert!(!config.unattended);
        assert!(config.query.is_none());
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.image.provider, "openai");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
query: "A cat in a garden."
unattended: true
output_file: cat.png
llm:
  provider: openai
  openai:
    api_key: sk-test
    model: gpt-4o
    temperature: 0.7
image:
  provider: openai
  openai:
    api_key: sk-test
    size: 1024x1024
    quality: hd
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(config.query.as_deref(), Some("A cat in a garden."));
        assert!(config.unattended);
        assert_eq!(config.output_file, "cat.png");

        let llm = config.llm.openai.unwrap();
        assert_eq!(llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(llm.model, "gpt-4o");
        assert_eq!(llm.temperature, 0.7);

        let image = config.image.openai.unwrap();
        assert_eq!(image.model, "dall-e-3");
        assert_eq!(image.quality, "hd");
    }

    #[test]
    fn test_env_key_fills_missing_credentials() {
        let mut config = Config::default();
        config.apply_api_key(Some("sk-env".to_string())).unwrap();

        assert_eq!(
            config.llm.openai.as_ref().unwrap().api_key.as_deref(),
            Some("sk-env")
        );
        assert_eq!(
            config.image.openai.as_ref().unwrap().api_key.as_deref(),
            Some("sk-env")
        );
    }

    #[test]
    fn test_config_key_wins_over_env() {
        let mut config = Config::default();
        config.llm.openai = Some(OpenAILlmConfig {
            api_key: Some("sk-file".to_string()),
            ..Default::default()
        });
        config.apply_api_key(Some("sk-env".to_string())).unwrap();

        assert_eq!(
            config.llm.openai.as_ref().unwrap().api_key.as_deref(),
            Some("sk-file")
        );
    }

    #[test]
    fn test_missing_credential_fails_fast() {
        let mut config = Config::default();
        let err = config.apply_api_key(None).unwrap_err();
        assert!(err.to_string().contains("missing credential"));
    }

    #[test]
    fn test_ollama_needs_no_credential() {
        let mut config = Config::default();
        config.llm.provider = "ollama".to_string();
        config.image.provider = "none".to_string();

        assert!(config.apply_api_key(None).is_ok());
    }
}
