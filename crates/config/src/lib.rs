//! Configuration loading, validation, and management for RideDesk.
//!
//! Loads configuration from `~/.ridedesk/config.toml` with environment
//! variable overrides. A `.env` file in the working directory fills in any
//! variable the process environment leaves unset. Validates all settings at
//! startup; the two provider
//! secrets are checked up front so a missing key fails fast instead of
//! surfacing later as an opaque provider error.

use ridedesk_core::provider::GenerationParams;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Dotenv file read from the working directory at startup.
pub const DOTENV_FILE: &str = ".env";

/// Environment variables consulted for the completion/transcription key.
pub const OPENAI_KEY_VARS: [&str; 2] = ["RIDEDESK_OPENAI_API_KEY", "OPENAI_API_KEY"];

/// Environment variables consulted for the synthesis key.
pub const ELEVENLABS_KEY_VARS: [&str; 2] = ["RIDEDESK_ELEVENLABS_API_KEY", "ELEVENLABS_API_KEY"];

/// The root configuration structure.
///
/// Maps directly to `~/.ridedesk/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion + transcription provider key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// Speech synthesis provider key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevenlabs_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_openai_url")]
    pub openai_api_url: String,

    /// Model and sampling parameters
    #[serde(default)]
    pub generation: GenerationParams,

    /// Dialogue loop settings
    #[serde(default)]
    pub dialogue: DialogueConfig,

    /// Speech settings
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Action execution settings
    #[serde(default)]
    pub actions: ActionsConfig,

    /// System prompt source
    #[serde(default)]
    pub identity: IdentityConfig,
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("elevenlabs_api_key", &redact(&self.elevenlabs_api_key))
            .field("openai_api_url", &self.openai_api_url)
            .field("generation", &self.generation)
            .field("dialogue", &self.dialogue)
            .field("voice", &self.voice)
            .field("actions", &self.actions)
            .field("identity", &self.identity)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Action round-trips allowed per utterance
    #[serde(default = "default_max_round_trips")]
    pub max_round_trips: u32,

    /// Extra attempts after a transient completion failure
    #[serde(default = "default_completion_retries")]
    pub completion_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Consecutive non-substantive utterances before the call is ended
    #[serde(default = "default_max_idle_utterances")]
    pub max_idle_utterances: u32,
}

fn default_max_round_trips() -> u32 {
    5
}
fn default_completion_retries() -> u32 {
    1
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_max_idle_utterances() -> u32 {
    3
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            max_round_trips: default_max_round_trips(),
            completion_retries: default_completion_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_idle_utterances: default_max_idle_utterances(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Speech-to-text model
    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    /// ElevenLabs voice id ("Rachel")
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    /// ElevenLabs synthesis model
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    #[serde(default = "default_elevenlabs_url")]
    pub elevenlabs_api_url: String,

    /// External player command; audio file path is appended
    #[serde(default = "default_player")]
    pub player: Vec<String>,

    /// Write replies here instead of playing them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_stt_model() -> String {
    "whisper-1".into()
}
fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".into()
}
fn default_tts_model() -> String {
    "eleven_monolingual_v1".into()
}
fn default_elevenlabs_url() -> String {
    "https://api.elevenlabs.io/v1".into()
}
fn default_player() -> Vec<String> {
    vec![
        "ffplay".into(),
        "-nodisp".into(),
        "-autoexit".into(),
        "-loglevel".into(),
        "quiet".into(),
    ]
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_model: default_stt_model(),
            voice_id: default_voice_id(),
            tts_model: default_tts_model(),
            elevenlabs_api_url: default_elevenlabs_url(),
            player: default_player(),
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Per-action execution timeout
    #[serde(default = "default_action_timeout")]
    pub timeout_secs: u64,
}

fn default_action_timeout() -> u64 {
    30
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_action_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Override the system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    /// Load the system prompt from this file instead of the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.ridedesk/config.toml).
    ///
    /// Environment variables override the file for secrets and model:
    /// - `RIDEDESK_OPENAI_API_KEY`, then `OPENAI_API_KEY`
    /// - `RIDEDESK_ELEVENLABS_API_KEY`, then `ELEVENLABS_API_KEY`
    /// - `RIDEDESK_MODEL`
    ///
    /// Variables missing from the process environment are taken from `./.env`.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_process_env()?;
        Ok(config)
    }

    /// Apply the process environment, falling back to `./.env`.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        let dotenv = read_dotenv(Path::new(DOTENV_FILE))?;
        self.apply_env(layered_env(|name| std::env::var(name).ok(), dotenv));
        Ok(())
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |vars: &[&str]| {
            vars.iter()
                .filter_map(|v| lookup(*v))
                .find(|v| !v.trim().is_empty())
        };

        if let Some(key) = first(&OPENAI_KEY_VARS[..]) {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = first(&ELEVENLABS_KEY_VARS[..]) {
            self.elevenlabs_api_key = Some(key);
        }
        if let Some(model) = lookup("RIDEDESK_MODEL") {
            self.generation.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ridedesk")
    }

    /// Default location of the instructions override file.
    pub fn instructions_path(&self) -> PathBuf {
        self.identity
            .instructions_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join(ridedesk_core::identity::INSTRUCTIONS_FILE))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generation;
        if !(0.0..=2.0).contains(&g.temperature) {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if !(-2.0..=2.0).contains(&g.frequency_penalty) || !(-2.0..=2.0).contains(&g.presence_penalty) {
            return Err(ConfigError::ValidationError(
                "generation penalties must be between -2.0 and 2.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&g.top_p) {
            return Err(ConfigError::ValidationError(
                "generation.top_p must be between 0.0 and 1.0".into(),
            ));
        }
        if g.max_tokens == 0 || g.max_context_turns == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_tokens and generation.max_context_turns must be > 0".into(),
            ));
        }
        if self.dialogue.max_round_trips == 0 {
            return Err(ConfigError::ValidationError(
                "dialogue.max_round_trips must be >= 1".into(),
            ));
        }
        if self.dialogue.max_idle_utterances == 0 {
            return Err(ConfigError::ValidationError(
                "dialogue.max_idle_utterances must be >= 1".into(),
            ));
        }
        if self.actions.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "actions.timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Fail fast if the completion key is missing.
    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingSecret {
                name: "OpenAI API key",
                env_var: OPENAI_KEY_VARS[1],
            })
    }

    /// Fail fast if the synthesis key is missing.
    pub fn require_elevenlabs_key(&self) -> Result<&str, ConfigError> {
        self.elevenlabs_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingSecret {
                name: "ElevenLabs API key",
                env_var: ELEVENLABS_KEY_VARS[1],
            })
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            elevenlabs_api_key: None,
            openai_api_url: default_openai_url(),
            generation: GenerationParams::default(),
            dialogue: DialogueConfig::default(),
            voice: VoiceConfig::default(),
            actions: ActionsConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Read `KEY=value` pairs from a dotenv file without touching the process
/// environment. A missing file yields an empty map.
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let read_error = |e: dotenvy::Error| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(read_error(e)),
    };

    let vars = iter
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(read_error)?;
    tracing::debug!(path = %path.display(), count = vars.len(), "Loaded dotenv file");
    Ok(vars)
}

/// Lookup that prefers `env` and falls back to dotenv values.
pub fn layered_env(
    env: impl Fn(&str) -> Option<String>,
    dotenv: HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> {
    move |name| env(name).or_else(|| dotenv.get(name).cloned())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing {name}: set {env_var} or add it to ~/.ridedesk/config.toml")]
    MissingSecret {
        name: &'static str,
        env_var: &'static str,
    },
}

impl From<ConfigError> for ridedesk_core::Error {
    fn from(e: ConfigError) -> Self {
        ridedesk_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generation.model, "gpt-3.5-turbo");
        assert_eq!(config.dialogue.max_round_trips, 5);
        assert_eq!(config.voice.tts_model, "eleven_monolingual_v1");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.generation, config.generation);
        assert_eq!(parsed.voice.voice_id, config.voice.voice_id);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.generation.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_round_trips_rejected() {
        let mut config = AppConfig::default();
        config.dialogue.max_round_trips = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.generation.max_context_turns, 10);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[generation]
model = "gpt-4o-mini"
temperature = 0.2

[dialogue]
max_round_trips = 3
"#
        )
        .unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.generation.model, "gpt-4o-mini");
        assert_eq!(config.generation.max_tokens, 500);
        assert_eq!(config.dialogue.max_round_trips, 3);
        assert_eq!(config.dialogue.completion_retries, 1);
    }

    #[test]
    fn invalid_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "generation = 12").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_secrets_and_model() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-generic"),
            ("RIDEDESK_OPENAI_API_KEY", "sk-specific"),
            ("ELEVENLABS_API_KEY", "el-key"),
            ("RIDEDESK_MODEL", "gpt-4o"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-specific"));
        assert_eq!(config.elevenlabs_api_key.as_deref(), Some("el-key"));
        assert_eq!(config.generation.model, "gpt-4o");
    }

    #[test]
    fn dotenv_file_supplies_missing_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# provider keys\nOPENAI_API_KEY=sk-from-dotenv\nELEVENLABS_API_KEY=\"el-from-dotenv\"\n",
        )
        .unwrap();

        let dotenv = read_dotenv(&path).unwrap();
        let mut config = AppConfig::default();
        config.apply_env(layered_env(|_| None, dotenv));
        assert_eq!(config.require_openai_key().unwrap(), "sk-from-dotenv");
        assert_eq!(config.require_elevenlabs_key().unwrap(), "el-from-dotenv");
    }

    #[test]
    fn process_env_wins_over_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "OPENAI_API_KEY=sk-from-dotenv\n").unwrap();

        let dotenv = read_dotenv(&path).unwrap();
        let env = |name: &str| (name == "OPENAI_API_KEY").then(|| "sk-from-shell".to_string());
        let mut config = AppConfig::default();
        config.apply_env(layered_env(env, dotenv));
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-from-shell"));
    }

    #[test]
    fn missing_dotenv_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let vars = read_dotenv(&dir.path().join(".env")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn missing_secrets_fail_fast() {
        let config = AppConfig::default();
        let err = config.require_openai_key().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        let err = config.require_elevenlabs_key().unwrap_err();
        assert!(err.to_string().contains("ELEVENLABS_API_KEY"));
    }

    #[test]
    fn debug_output_redacts_keys() {
        let config = AppConfig {
            openai_api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-3.5-turbo"));
        assert!(toml_str.contains("max_round_trips"));
    }
}
