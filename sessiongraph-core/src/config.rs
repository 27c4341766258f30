use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SessionGraphConfig {
    pub extraction: ExtractionConfig,
    pub cache: CacheConfig,
    pub ingest: IngestConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractionConfig {
    pub backend: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub min_call_interval_ms: u64,
    pub min_content_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            backend: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8192,
            temperature: 0.1,
            timeout_seconds: 120,
            min_call_interval_ms: 1000,
            min_content_chars: 20,
        }
    }
}

impl ExtractionConfig {
    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: "./cache".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestConfig {
    pub input_dir: String,
    pub recursive: bool,
    pub project_markers: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_dir: "~/.claude/projects".to_string(),
            recursive: true,
            project_markers: vec!["agrama".to_string(), "agentprobe".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BatchConfig {
    pub max_messages_per_session: usize,
    pub output_dir: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_messages_per_session: 50,
            output_dir: "./graphs".to_string(),
        }
    }
}

impl SessionGraphConfig {
    /// Load from an optional TOML file, then apply `SESSIONGRAPH__SECTION__KEY`
    /// environment overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SESSIONGRAPH").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    pub fn cache_dir(&self) -> PathBuf {
        expand_path(&self.cache.dir)
    }

    pub fn input_dir(&self) -> PathBuf {
        expand_path(&self.ingest.input_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        expand_path(&self.batch.output_dir)
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
