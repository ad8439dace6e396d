use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{AlterEgoError, Result};

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
/// Polling Instagram faster than this gets the session rate limited.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_HISTORY: usize = 10;
pub const DEFAULT_MAX_RESPONSE_CHARS: usize = 1000;
/// Instagram rejects direct messages above this size.
pub const MAX_RESPONSE_CHARS_CEILING: usize = 2000;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 20;

/// Flat environment variable names kept from the legacy deployment scripts,
/// mapped onto their nested config paths.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("INSTAGRAM_USERNAME", "instagram.username"),
    ("INSTAGRAM_SESSION_ID", "instagram.session_id"),
    ("POLL_INTERVAL", "instagram.poll_interval_secs"),
    ("MAX_THREADS_PER_POLL", "instagram.max_threads_per_poll"),
    ("MAX_MESSAGES_PER_THREAD", "instagram.max_messages_per_thread"),
    ("MANYCHAT_API_TOKEN", "manychat.api_token"),
    ("AZURE_OPENAI_API_KEY", "provider.api_key"),
    ("AZURE_ENDPOINT", "provider.endpoint"),
    ("AZURE_DEPLOYMENT", "provider.deployment"),
    ("AZURE_API_VERSION", "provider.api_version"),
    ("ACTIVATE_PASSCODE", "persona.activate_phrase"),
    ("DEACTIVATE_PASSCODE", "persona.deactivate_phrase"),
    ("ALTER_EGO_PERSONALITY", "persona.system_prompt"),
    ("MAX_HISTORY_LENGTH", "persona.max_history"),
    ("MAX_RESPONSE_LENGTH", "persona.max_response_chars"),
    ("PORT", "gateway.port"),
];

/// Which surfaces the gateway binary drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Instagram polling loop only.
    Poll,
    /// HTTP surface only (chat API + ManyChat webhook).
    Serve,
    /// Both, polling only when Instagram credentials are present.
    Run,
}

impl RunMode {
    /// Whether this mode requires Instagram credentials at startup.
    pub fn requires_instagram(self) -> bool {
        matches!(self, RunMode::Poll)
    }
}

/// Top-level config (alterego.toml + ALTEREGO_* env overrides + legacy env names).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlterEgoConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub instagram: InstagramConfig,
    #[serde(default)]
    pub manychat: ManyChatConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// When set, POST routes require `Authorization: Bearer <api_token>`.
    pub api_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            api_token: None,
        }
    }
}

/// Session-authenticated Instagram direct-message polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    #[serde(default)]
    pub username: String,
    /// Value of the `sessionid` cookie of a logged-in account.
    #[serde(default)]
    pub session_id: String,
    #[serde(default = "default_instagram_base_url")]
    pub base_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_threads")]
    pub max_threads_per_poll: usize,
    #[serde(default = "default_max_messages")]
    pub max_messages_per_thread: usize,
}

impl InstagramConfig {
    /// True once either credential has been supplied.
    pub fn is_configured(&self) -> bool {
        !self.username.trim().is_empty() || !self.session_id.trim().is_empty()
    }
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            session_id: String::new(),
            base_url: default_instagram_base_url(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_threads_per_poll: default_max_threads(),
            max_messages_per_thread: default_max_messages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManyChatConfig {
    pub api_token: Option<String>,
    #[serde(default = "default_manychat_base_url")]
    pub base_url: String,
}

impl Default for ManyChatConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: default_manychat_base_url(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Azure OpenAI deployment (`api-key` header, deployment in the path).
    #[default]
    Azure,
    /// OpenAI or any OpenAI-compatible endpoint (bearer auth).
    Openai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    /// Azure resource endpoint, or base URL for OpenAI-compatible providers.
    pub endpoint: Option<String>,
    #[serde(default = "default_deployment")]
    pub deployment: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Model name sent in the body (OpenAI only; Azure routes by deployment).
    pub model: Option<String>,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: String::new(),
            endpoint: None,
            deployment: default_deployment(),
            api_version: default_api_version(),
            model: None,
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
        }
    }
}

/// Built-in persona profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileName {
    /// Short gen-z replies, mini-games, quick replies, streak stats.
    #[default]
    Harsha,
    /// Mood-driven personality templates, easter eggs, quirks.
    Enhanced,
    /// Plain alter ego with a single configurable personality.
    Classic,
}

/// How activation/deactivation intent is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentStrategy {
    /// Case-insensitive substring match on the trigger phrases.
    #[default]
    Keyword,
    /// Ask the completion provider, falling back to keywords on failure.
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default)]
    pub profile: ProfileName,
    /// Overrides the profile's activation phrase.
    pub activate_phrase: Option<String>,
    /// Overrides the profile's deactivation phrase.
    pub deactivate_phrase: Option<String>,
    /// Overrides the profile's system prompt template.
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub intent: IntentStrategy,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_max_response_chars")]
    pub max_response_chars: usize,
    /// Overrides whether the profile offers functions to the model.
    pub function_calling: Option<bool>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            profile: ProfileName::default(),
            activate_phrase: None,
            deactivate_phrase: None,
            system_prompt: None,
            intent: IntentStrategy::default(),
            max_history: DEFAULT_MAX_HISTORY,
            max_response_chars: DEFAULT_MAX_RESPONSE_CHARS,
            function_calling: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-lifetime state only.
    #[default]
    Memory,
    /// Embedded SQLite file at `database.path`.
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_db_path(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_instagram_base_url() -> String {
    "https://i.instagram.com/api/v1".to_string()
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_max_threads() -> usize {
    20
}
fn default_max_messages() -> usize {
    10
}
fn default_manychat_base_url() -> String {
    "https://api.manychat.com".to_string()
}
fn default_deployment() -> String {
    "gpt-5-chat".to_string()
}
fn default_api_version() -> String {
    "2024-12-01-preview".to_string()
}
fn default_provider_timeout() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}
fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}
fn default_max_response_chars() -> usize {
    DEFAULT_MAX_RESPONSE_CHARS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.alterego/alterego.db", home)
}

impl AlterEgoConfig {
    /// Load config from a TOML file with environment overrides.
    ///
    /// Precedence, lowest first:
    ///   1. TOML file (explicit path, else ~/.alterego/alterego.toml; missing file is fine)
    ///   2. legacy flat variables (`AZURE_OPENAI_API_KEY`, `POLL_INTERVAL`, ...)
    ///   3. `ALTEREGO_*` variables, nested with `__` (e.g. `ALTEREGO_PROVIDER__KIND`)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| AlterEgoError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        let legacy: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
        Figment::new()
            .merge(Toml::file(path))
            .merge(
                Env::raw()
                    .only(&legacy)
                    .map(|key| legacy_path(key.as_str()).into()),
            )
            .merge(Env::prefixed("ALTEREGO_").split("__"))
    }

    /// Check every setting that would make the relay misbehave at runtime.
    ///
    /// All problems are collected so the operator can fix them in one pass.
    pub fn validate(&self, mode: RunMode) -> Result<()> {
        let mut problems = Vec::new();

        if self.provider.api_key.trim().is_empty() {
            problems.push("provider.api_key (AZURE_OPENAI_API_KEY) is required".to_string());
        }
        if self.provider.kind == ProviderKind::Azure
            && self
                .provider
                .endpoint
                .as_deref()
                .map(|e| e.trim().is_empty())
                .unwrap_or(true)
        {
            problems.push("provider.endpoint (AZURE_ENDPOINT) is required for azure".to_string());
        }
        if !(1..=120).contains(&self.provider.timeout_secs) {
            problems.push(format!(
                "provider.timeout_secs must be between 1 and 120 (got {})",
                self.provider.timeout_secs
            ));
        }

        let wants_instagram = mode.requires_instagram()
            || (mode == RunMode::Run && self.instagram.is_configured());
        if wants_instagram {
            if self.instagram.username.trim().is_empty() {
                problems.push("instagram.username (INSTAGRAM_USERNAME) is required".to_string());
            }
            if self.instagram.session_id.trim().is_empty() {
                problems
                    .push("instagram.session_id (INSTAGRAM_SESSION_ID) is required".to_string());
            }
            if self.instagram.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
                problems.push(format!(
                    "instagram.poll_interval_secs should be at least {} seconds to avoid rate limiting (got {})",
                    MIN_POLL_INTERVAL_SECS, self.instagram.poll_interval_secs
                ));
            }
            if self.instagram.max_threads_per_poll == 0
                || self.instagram.max_messages_per_thread == 0
            {
                problems.push("instagram poll limits must be greater than zero".to_string());
            }
        }

        if !(10..=MAX_RESPONSE_CHARS_CEILING).contains(&self.persona.max_response_chars) {
            problems.push(format!(
                "persona.max_response_chars must be between 10 and {} (got {})",
                MAX_RESPONSE_CHARS_CEILING, self.persona.max_response_chars
            ));
        }
        if !(2..=100).contains(&self.persona.max_history) {
            problems.push(format!(
                "persona.max_history must be between 2 and 100 (got {})",
                self.persona.max_history
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AlterEgoError::InvalidConfig { problems })
        }
    }
}

fn legacy_path(env_name: &str) -> String {
    LEGACY_ENV
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(env_name))
        .map(|(_, path)| (*path).to_string())
        .unwrap_or_else(|| env_name.to_ascii_lowercase())
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.alterego/alterego.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn valid_config() -> AlterEgoConfig {
        let mut config = AlterEgoConfig::default();
        config.provider.api_key = "key".to_string();
        config.provider.endpoint = Some("https://example.openai.azure.com/".to_string());
        config
    }

    #[test]
    fn defaults_match_deployment_values() {
        let config = AlterEgoConfig::default();
        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(config.instagram.poll_interval_secs, 30);
        assert_eq!(config.persona.max_history, 10);
        assert_eq!(config.persona.max_response_chars, 1000);
        assert_eq!(config.persona.profile, ProfileName::Harsha);
        assert_eq!(config.database.backend, StoreBackend::Memory);
    }

    #[test]
    fn valid_serve_config_passes() {
        assert!(valid_config().validate(RunMode::Serve).is_ok());
    }

    #[test]
    fn missing_credentials_are_all_reported() {
        let config = AlterEgoConfig::default();
        let err = config.validate(RunMode::Poll).unwrap_err();
        match err {
            AlterEgoError::InvalidConfig { problems } => {
                assert!(problems.iter().any(|p| p.contains("api_key")));
                assert!(problems.iter().any(|p| p.contains("endpoint")));
                assert!(problems.iter().any(|p| p.contains("username")));
                assert!(problems.iter().any(|p| p.contains("session_id")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn poll_interval_below_floor_is_rejected() {
        let mut config = valid_config();
        config.instagram.username = "me".to_string();
        config.instagram.session_id = "sess".to_string();
        config.instagram.poll_interval_secs = 5;
        let err = config.validate(RunMode::Poll).unwrap_err();
        assert!(err.to_string().contains("poll_interval_secs"));
    }

    #[test]
    fn run_mode_skips_instagram_checks_when_unconfigured() {
        let mut config = valid_config();
        config.instagram.poll_interval_secs = 1;
        assert!(config.validate(RunMode::Run).is_ok());
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        let mut config = valid_config();
        config.persona.max_response_chars = 5000;
        config.persona.max_history = 0;
        config.provider.timeout_secs = 0;
        let err = config.validate(RunMode::Serve).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("max_response_chars"));
        assert!(text.contains("max_history"));
        assert!(text.contains("timeout_secs"));
    }

    #[test]
    fn openai_kind_does_not_need_endpoint() {
        let mut config = valid_config();
        config.provider.kind = ProviderKind::Openai;
        config.provider.endpoint = None;
        assert!(config.validate(RunMode::Serve).is_ok());
    }

    #[test]
    fn legacy_env_names_are_mapped() {
        Jail::expect_with(|jail| {
            jail.set_env("AZURE_OPENAI_API_KEY", "legacy-key");
            jail.set_env("POLL_INTERVAL", "45");
            jail.set_env("ACTIVATE_PASSCODE", "wake up");
            let config = AlterEgoConfig::load(Some("missing.toml"))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.provider.api_key, "legacy-key");
            assert_eq!(config.instagram.poll_interval_secs, 45);
            assert_eq!(config.persona.activate_phrase.as_deref(), Some("wake up"));
            Ok(())
        });
    }

    #[test]
    fn toml_file_and_prefixed_env_merge() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "alterego.toml",
                r#"
                [persona]
                profile = "enhanced"
                max_history = 15

                [provider]
                kind = "openai"
                api_key = "from-file"
                "#,
            )?;
            jail.set_env("ALTEREGO_PROVIDER__API_KEY", "from-env");
            let config = AlterEgoConfig::load(Some("alterego.toml"))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.persona.profile, ProfileName::Enhanced);
            assert_eq!(config.persona.max_history, 15);
            assert_eq!(config.provider.kind, ProviderKind::Openai);
            assert_eq!(config.provider.api_key, "from-env");
            Ok(())
        });
    }
}
