//! Configuration Loading
//!
//! A session is configured from two files plus the environment:
//!
//! - the **story file** (YAML, required): model, word budget, temperature and
//!   the story/player/companion cards, see [`crate::story::StoryCard`]
//! - the **settings file** (TOML, optional) at
//!   `$XDG_CONFIG_HOME/taleweaver/config.toml`: backend endpoint, timeouts
//!   and reveal cadence
//!
//! # Configuration Priority
//!
//! Values are applied with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. Story file
//! 4. Settings file
//! 5. Default values
//!
//! # Example Settings
//!
//! ```toml
//! [backend]
//! url = "http://localhost:11434"
//! connect_timeout_ms = 10000
//! request_timeout_secs = 600
//!
//! [reveal]
//! interval_ms = 150
//! first_unit_delay_ms = 500
//! ```
//!
//! # Environment Variables
//!
//! - `TALEWEAVER_OLLAMA_URL`: full backend base URL
//! - `OLLAMA_HOST` / `OLLAMA_PORT`: backend host (or URL) and port
//! - `TALEWEAVER_MODEL`: model override

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use crate::error::ConfigError;
use crate::reveal::RevealConfig;
use crate::story::StoryCard;

/// Default backend base URL
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default connect timeout for the backend
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from the story file
    Story,
    /// Value from the TOML settings file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::Story => write!(f, "story file"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Backend section of the settings file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Backend base URL
    pub url: Option<String>,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Whole-request timeout in seconds (0 = none)
    pub request_timeout_secs: Option<u64>,
}

/// Reveal section of the settings file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealToml {
    /// Delay between revealed units in milliseconds
    pub interval_ms: Option<u64>,

    /// Delay before the first unit of a passage in milliseconds
    pub first_unit_delay_ms: Option<u64>,
}

/// Top-level settings file structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsToml {
    /// Backend configuration section
    pub backend: BackendToml,

    /// Reveal configuration section
    pub reveal: RevealToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Connection settings for the chat backend
#[derive(Clone, Debug, PartialEq)]
pub struct BackendSettings {
    /// Base URL, without the `/api/chat` suffix
    pub base_url: String,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout; `None` lets long generations run to completion
    pub request_timeout: Option<Duration>,
    /// Where `base_url` came from
    pub url_source: ConfigSource,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
            url_source: ConfigSource::Default,
        }
    }
}

impl BackendSettings {
    fn set_url(&mut self, url: &str, source: ConfigSource) {
        self.base_url = url.trim_end_matches('/').to_string();
        self.url_source = source;
    }
}

/// Per-session sampling and budget settings
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Backend model identifier
    pub model: String,
    /// History budget in words
    pub word_budget: usize,
    /// Context size requested from the backend
    pub context_size: usize,
    /// Sampling temperature
    pub temperature: f32,
}

impl SessionConfig {
    /// Take model, budget and temperature from a story card
    #[must_use]
    pub fn from_story(story: &StoryCard) -> Self {
        Self {
            model: story.model.clone(),
            word_budget: story.num_tokens,
            context_size: story.num_tokens,
            temperature: story.temperature,
        }
    }
}

/// Everything a front end needs to start a session
#[derive(Clone, Debug)]
pub struct LoadedConfig {
    /// The parsed story
    pub story: StoryCard,
    /// Session sampling settings
    pub session: SessionConfig,
    /// Backend connection settings
    pub backend: BackendSettings,
    /// Reveal cadence
    pub reveal: RevealConfig,
    /// Settings file that was read, if any
    pub settings_path: Option<PathBuf>,
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default settings file path
///
/// Returns `$XDG_CONFIG_HOME/taleweaver/config.toml` or
/// `~/.config/taleweaver/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("taleweaver").join("config.toml"))
}

/// Load the story and settings with full priority handling
///
/// `settings_path` of `None` uses [`default_config_path`]. A missing settings
/// file is not an error; a missing story file is.
///
/// # Errors
///
/// Returns an error if the story cannot be read or validated, or if the
/// settings file exists but cannot be parsed.
pub fn load_config(
    story_path: &Path,
    settings_path: Option<PathBuf>,
    overrides: &ConfigOverrides,
) -> Result<LoadedConfig, ConfigError> {
    let story = StoryCard::load(story_path)?;
    let settings_path = settings_path.or_else(default_config_path);
    let settings = load_settings_from_path(settings_path.as_deref())?;

    let mut config = resolve(story, &settings, |key| std::env::var(key).ok());
    if settings_path.as_deref().is_some_and(Path::exists) {
        config.settings_path = settings_path;
    }
    overrides.apply(&mut config);
    validate(&config)?;

    tracing::info!(
        model = %config.session.model,
        url = %config.backend.base_url,
        url_source = %config.backend.url_source,
        word_budget = config.session.word_budget,
        "Resolved session configuration"
    );

    Ok(config)
}

/// Read the TOML settings file
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings_from_path(path: Option<&Path>) -> Result<SettingsToml, ConfigError> {
    let Some(path) = path else {
        return Ok(SettingsToml::default());
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "Settings file not found, using defaults");
        return Ok(SettingsToml::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let settings: SettingsToml = toml::from_str(&content)?;

    tracing::info!(path = %path.display(), "Loaded settings from file");
    Ok(settings)
}

/// Combine settings file, story and environment (lowest to highest priority)
///
/// `env` looks up an environment variable by name.
pub fn resolve(
    story: StoryCard,
    settings: &SettingsToml,
    env: impl Fn(&str) -> Option<String>,
) -> LoadedConfig {
    let mut backend = BackendSettings::default();
    let mut reveal = RevealConfig::default();

    // Settings file
    if let Some(ref url) = settings.backend.url {
        backend.set_url(url, ConfigSource::File);
    }
    if let Some(ms) = settings.backend.connect_timeout_ms {
        backend.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(secs) = settings.backend.request_timeout_secs {
        backend.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if let Some(ms) = settings.reveal.interval_ms {
        reveal.interval = Duration::from_millis(ms);
    }
    if let Some(ms) = settings.reveal.first_unit_delay_ms {
        reveal.first_unit_delay = Duration::from_millis(ms);
    }

    // Story file
    if let Some(ref url) = story.ollama_url {
        backend.set_url(url, ConfigSource::Story);
    }
    let mut session = SessionConfig::from_story(&story);

    // Environment
    if let Some(url) = env_backend_url(&env) {
        backend.set_url(&url, ConfigSource::Env);
    }
    if let Some(model) = env("TALEWEAVER_MODEL").filter(|m| !m.trim().is_empty()) {
        session.model = model;
    }

    LoadedConfig {
        story,
        session,
        backend,
        reveal,
        settings_path: None,
    }
}

/// Backend URL from `TALEWEAVER_OLLAMA_URL`, or `OLLAMA_HOST`/`OLLAMA_PORT`
fn env_backend_url(env: &impl Fn(&str) -> Option<String>) -> Option<String> {
    if let Some(url) = env("TALEWEAVER_OLLAMA_URL").filter(|u| !u.trim().is_empty()) {
        return Some(url);
    }

    let host = env("OLLAMA_HOST").filter(|h| !h.trim().is_empty())?;
    if host.starts_with("http://") || host.starts_with("https://") {
        return Some(host);
    }
    if host.contains(':') {
        return Some(format!("http://{host}"));
    }
    let port = env("OLLAMA_PORT")
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(11434);
    Some(format!("http://{host}:{port}"))
}

fn validate(config: &LoadedConfig) -> Result<(), ConfigError> {
    let url = &config.backend.base_url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "backend url must start with http:// or https:// (got {url:?} from {})",
            config.backend.url_source
        )));
    }
    if config.session.model.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "model must not be empty".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied last
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend URL override
    pub ollama_url: Option<String>,

    /// Model override
    pub model: Option<String>,

    /// Reveal interval override (milliseconds)
    pub reveal_interval_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set backend URL override
    #[must_use]
    pub fn with_ollama_url(mut self, url: impl Into<String>) -> Self {
        self.ollama_url = Some(url.into());
        self
    }

    /// Set model override
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set reveal interval override
    #[must_use]
    pub fn with_reveal_interval_ms(mut self, ms: u64) -> Self {
        self.reveal_interval_ms = Some(ms);
        self
    }

    /// Apply overrides to a resolved configuration
    pub fn apply(&self, config: &mut LoadedConfig) {
        if let Some(ref url) = self.ollama_url {
            config.backend.set_url(url, ConfigSource::Cli);
        }
        if let Some(ref model) = self.model {
            config.session.model = model.clone();
        }
        if let Some(ms) = self.reveal_interval_ms {
            config.reveal.interval = Duration::from_millis(ms);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn story(extra: &str) -> StoryCard {
        StoryCard::from_yaml(&format!(
            "story_card: A quiet village.\nplayer_card: A tinker.\n{extra}"
        ))
        .unwrap()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = resolve(story(""), &SettingsToml::default(), no_env);

        assert_eq!(config.backend.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.backend.url_source, ConfigSource::Default);
        assert_eq!(config.backend.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(config.backend.request_timeout.is_none());
        assert_eq!(config.session.model, "llama2");
        assert_eq!(config.session.word_budget, 4096);
        assert_eq!(config.session.context_size, 4096);
        assert_eq!(config.reveal, RevealConfig::default());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.to_string_lossy().contains("taleweaver"));
            assert!(p.to_string_lossy().ends_with("config.toml"));
        }
    }

    #[test]
    fn test_parse_settings_file() {
        let toml_content = r#"
[backend]
url = "http://llm.lan:11434/"
connect_timeout_ms = 2500
request_timeout_secs = 300

[reveal]
interval_ms = 90
first_unit_delay_ms = 0
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let settings = load_settings_from_path(Some(file.path())).unwrap();
        let config = resolve(story(""), &settings, no_env);

        assert_eq!(config.backend.base_url, "http://llm.lan:11434");
        assert_eq!(config.backend.url_source, ConfigSource::File);
        assert_eq!(config.backend.connect_timeout, Duration::from_millis(2500));
        assert_eq!(config.backend.request_timeout, Some(Duration::from_secs(300)));
        assert_eq!(config.reveal.interval, Duration::from_millis(90));
        assert_eq!(config.reveal.first_unit_delay, Duration::ZERO);
    }

    #[test]
    fn test_zero_request_timeout_means_none() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[backend]\nrequest_timeout_secs = 0\n").unwrap();
        let settings = load_settings_from_path(Some(file.path())).unwrap();
        let config = resolve(story(""), &settings, no_env);
        assert!(config.backend.request_timeout.is_none());
    }

    #[test]
    fn test_missing_settings_file_graceful() {
        let settings =
            load_settings_from_path(Some(Path::new("/nonexistent/taleweaver/config.toml")))
                .unwrap();
        assert!(settings.backend.url.is_none());
        assert!(load_settings_from_path(None).unwrap().reveal.interval_ms.is_none());
    }

    #[test]
    fn test_malformed_settings_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[backend\nurl = 3\n").unwrap();
        let result = load_settings_from_path(Some(file.path()));
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_story_overrides_settings_file() {
        let settings = SettingsToml {
            backend: BackendToml {
                url: Some("http://file:11434".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = resolve(story("ollama_url: http://story:11434\n"), &settings, no_env);
        assert_eq!(config.backend.base_url, "http://story:11434");
        assert_eq!(config.backend.url_source, ConfigSource::Story);
    }

    #[test]
    fn test_env_overrides_story() {
        let env = env_of(&[
            ("TALEWEAVER_OLLAMA_URL", "http://env:9999"),
            ("TALEWEAVER_MODEL", "phi3"),
        ]);
        let config = resolve(
            story("ollama_url: http://story:11434\nmodel: llama3\n"),
            &SettingsToml::default(),
            env,
        );
        assert_eq!(config.backend.base_url, "http://env:9999");
        assert_eq!(config.backend.url_source, ConfigSource::Env);
        assert_eq!(config.session.model, "phi3");
    }

    #[test]
    fn test_ollama_host_forms() {
        let url = |pairs: &[(&str, &str)]| {
            resolve(story(""), &SettingsToml::default(), env_of(pairs))
                .backend
                .base_url
        };

        assert_eq!(url(&[("OLLAMA_HOST", "gpu")]), "http://gpu:11434");
        assert_eq!(
            url(&[("OLLAMA_HOST", "gpu"), ("OLLAMA_PORT", "8080")]),
            "http://gpu:8080"
        );
        assert_eq!(url(&[("OLLAMA_HOST", "0.0.0.0:7000")]), "http://0.0.0.0:7000");
        assert_eq!(
            url(&[("OLLAMA_HOST", "https://ollama.example.com")]),
            "https://ollama.example.com"
        );
        assert_eq!(url(&[("OLLAMA_HOST", "")]), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_cli_overrides_env() {
        let env = env_of(&[("TALEWEAVER_OLLAMA_URL", "http://env:9999")]);
        let mut config = resolve(story(""), &SettingsToml::default(), env);

        ConfigOverrides::new()
            .with_ollama_url("http://cli:1234")
            .with_model("gemma")
            .with_reveal_interval_ms(40)
            .apply(&mut config);

        assert_eq!(config.backend.base_url, "http://cli:1234");
        assert_eq!(config.backend.url_source, ConfigSource::Cli);
        assert_eq!(config.session.model, "gemma");
        assert_eq!(config.reveal.interval, Duration::from_millis(40));
    }

    #[test]
    fn test_empty_overrides_no_change() {
        let mut config = resolve(story(""), &SettingsToml::default(), no_env);
        let before = config.backend.clone();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.backend, before);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = resolve(story(""), &SettingsToml::default(), no_env);
        ConfigOverrides::new()
            .with_ollama_url("localhost:11434")
            .apply(&mut config);
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("CLI"));
    }

    #[test]
    fn test_load_config_end_to_end() {
        let mut story_file = NamedTempFile::new().unwrap();
        story_file
            .write_all(b"story_card: Fog.\nplayer_card: Scout.\nnum_tokens: 512\n")
            .unwrap();
        let mut settings_file = NamedTempFile::new().unwrap();
        settings_file
            .write_all(b"[reveal]\ninterval_ms = 200\n")
            .unwrap();

        let config = load_config(
            story_file.path(),
            Some(settings_file.path().to_path_buf()),
            &ConfigOverrides::new().with_model("cli-model"),
        )
        .unwrap();

        assert_eq!(config.session.word_budget, 512);
        assert_eq!(config.session.model, "cli-model");
        assert_eq!(config.reveal.interval, Duration::from_millis(200));
        assert_eq!(
            config.settings_path.as_deref(),
            Some(settings_file.path())
        );
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::Cli), "CLI");
        assert_eq!(format!("{}", ConfigSource::Env), "environment");
        assert_eq!(format!("{}", ConfigSource::Story), "story file");
        assert_eq!(format!("{}", ConfigSource::File), "config file");
        assert_eq!(format!("{}", ConfigSource::Default), "default");
    }
}
