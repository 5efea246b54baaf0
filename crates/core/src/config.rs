use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub resolver: ResolverConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub listings: ListingsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// `memory://` selects the in-process store; anything else is a sqlite URL.
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.url.trim() == MEMORY_DATABASE_URL
    }
}

pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub token: SecretString,
    /// Identity every caller must present. `None` lets callers name themselves.
    pub identity: Option<String>,
    pub operator_identities: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    pub mode: ResolverMode,
    pub timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ListingsConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub ttl_days: i64,
    pub seed_demo_data: bool,
}

impl ListingsConfig {
    /// Requested result count clamped to `1..=max_limit`, `default_limit` when absent.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).clamp(1, self.max_limit.max(1))
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverMode {
    Rules,
    Llm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub auth_token: Option<String>,
    pub auth_identity: Option<String>,
    pub resolver_mode: Option<ResolverMode>,
    pub server_port: Option<u16>,
    pub seed_demo_data: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://roomie.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            auth: AuthConfig {
                token: String::new().into(),
                identity: None,
                operator_identities: Vec::new(),
            },
            resolver: ResolverConfig { mode: ResolverMode::Rules, timeout_ms: 5_000 },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8086,
                graceful_shutdown_secs: 15,
            },
            listings: ListingsConfig {
                default_limit: 10,
                max_limit: 50,
                ttl_days: 30,
                seed_demo_data: false,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for ResolverMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rules" | "rule" => Ok(Self::Rules),
            "llm" | "model" => Ok(Self::Llm),
            other => Err(ConfigError::Validation(format!(
                "unsupported resolver mode `{other}` (expected rules|llm)"
            ))),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("roomie.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(token) = auth.token {
                self.auth.token = secret_value(token);
            }
            if let Some(identity) = auth.identity {
                self.auth.identity = non_blank(identity);
            }
            if let Some(operator_identities) = auth.operator_identities {
                self.auth.operator_identities = operator_identities;
            }
        }

        if let Some(resolver) = patch.resolver {
            if let Some(mode) = resolver.mode {
                self.resolver.mode = mode;
            }
            if let Some(timeout_ms) = resolver.timeout_ms {
                self.resolver.timeout_ms = timeout_ms;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(listings) = patch.listings {
            if let Some(default_limit) = listings.default_limit {
                self.listings.default_limit = default_limit;
            }
            if let Some(max_limit) = listings.max_limit {
                self.listings.max_limit = max_limit;
            }
            if let Some(ttl_days) = listings.ttl_days {
                self.listings.ttl_days = ttl_days;
            }
            if let Some(seed_demo_data) = listings.seed_demo_data {
                self.listings.seed_demo_data = seed_demo_data;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ROOMIE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ROOMIE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("ROOMIE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ROOMIE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ROOMIE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        // Bare AUTH_TOKEN / MY_NUMBER are what existing deployments already export.
        let token = read_env("ROOMIE_AUTH_TOKEN").or_else(|| read_env("AUTH_TOKEN"));
        if let Some(value) = token {
            self.auth.token = secret_value(value);
        }
        let identity = read_env("ROOMIE_AUTH_IDENTITY").or_else(|| read_env("MY_NUMBER"));
        if let Some(value) = identity {
            self.auth.identity = non_blank(value);
        }
        if let Some(value) = read_env("ROOMIE_AUTH_OPERATOR_IDENTITIES") {
            self.auth.operator_identities = value
                .split(',')
                .map(str::trim)
                .filter(|identity| !identity.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(value) = read_env("ROOMIE_RESOLVER_MODE") {
            self.resolver.mode = value.parse()?;
        }
        if let Some(value) = read_env("ROOMIE_RESOLVER_TIMEOUT_MS") {
            self.resolver.timeout_ms = parse_u64("ROOMIE_RESOLVER_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = read_env("ROOMIE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("ROOMIE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ROOMIE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("ROOMIE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("ROOMIE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("ROOMIE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ROOMIE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("ROOMIE_SERVER_PORT").map(|value| ("ROOMIE_SERVER_PORT", value));
        let port = port.or_else(|| read_env("PORT").map(|value| ("PORT", value)));
        if let Some((key, value)) = port {
            self.server.port = parse_u16(key, &value)?;
        }
        if let Some(value) = read_env("ROOMIE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ROOMIE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("ROOMIE_LISTINGS_DEFAULT_LIMIT") {
            self.listings.default_limit = parse_usize("ROOMIE_LISTINGS_DEFAULT_LIMIT", &value)?;
        }
        if let Some(value) = read_env("ROOMIE_LISTINGS_MAX_LIMIT") {
            self.listings.max_limit = parse_usize("ROOMIE_LISTINGS_MAX_LIMIT", &value)?;
        }
        if let Some(value) = read_env("ROOMIE_LISTINGS_TTL_DAYS") {
            self.listings.ttl_days = parse_i64("ROOMIE_LISTINGS_TTL_DAYS", &value)?;
        }
        if let Some(value) = read_env("ROOMIE_LISTINGS_SEED_DEMO_DATA") {
            self.listings.seed_demo_data = parse_bool("ROOMIE_LISTINGS_SEED_DEMO_DATA", &value)?;
        }

        let log_level = read_env("ROOMIE_LOGGING_LEVEL").or_else(|| read_env("ROOMIE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ROOMIE_LOGGING_FORMAT").or_else(|| read_env("ROOMIE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(auth_token) = overrides.auth_token {
            self.auth.token = secret_value(auth_token);
        }
        if let Some(auth_identity) = overrides.auth_identity {
            self.auth.identity = non_blank(auth_identity);
        }
        if let Some(resolver_mode) = overrides.resolver_mode {
            self.resolver.mode = resolver_mode;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(seed_demo_data) = overrides.seed_demo_data {
            self.listings.seed_demo_data = seed_demo_data;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_auth(&self.auth)?;
        validate_resolver(&self.resolver, &self.llm)?;
        validate_server(&self.server)?;
        validate_listings(&self.listings)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("roomie.toml"), PathBuf::from("config/roomie.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let supported = url == MEMORY_DATABASE_URL
        || url.starts_with("sqlite://")
        || url.starts_with("sqlite::")
        || url.starts_with("sqlite:");
    if !supported {
        return Err(ConfigError::Validation(
            "database.url must be `memory://` or a sqlite URL (`sqlite://...`, `sqlite::memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigError> {
    let token = auth.token.expose_secret();
    if token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "auth.token is required (set ROOMIE_AUTH_TOKEN or AUTH_TOKEN)".to_string(),
        ));
    }
    if token.trim().len() < 8 {
        return Err(ConfigError::Validation(
            "auth.token must be at least 8 characters long".to_string(),
        ));
    }
    Ok(())
}

fn validate_resolver(resolver: &ResolverConfig, llm: &LlmConfig) -> Result<(), ConfigError> {
    if resolver.timeout_ms == 0 || resolver.timeout_ms > 120_000 {
        return Err(ConfigError::Validation(
            "resolver.timeout_ms must be in range 1..=120000".to_string(),
        ));
    }

    if resolver.mode == ResolverMode::Rules {
        return Ok(());
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for the ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_listings(listings: &ListingsConfig) -> Result<(), ConfigError> {
    if listings.max_limit == 0 {
        return Err(ConfigError::Validation(
            "listings.max_limit must be greater than zero".to_string(),
        ));
    }
    if listings.default_limit == 0 || listings.default_limit > listings.max_limit {
        return Err(ConfigError::Validation(
            "listings.default_limit must be in range 1..=listings.max_limit".to_string(),
        ));
    }
    if listings.ttl_days <= 0 {
        return Err(ConfigError::Validation(
            "listings.ttl_days must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    auth: Option<AuthPatch>,
    resolver: Option<ResolverPatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    listings: Option<ListingsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    token: Option<String>,
    identity: Option<String>,
    operator_identities: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ResolverPatch {
    mode: Option<ResolverMode>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ListingsPatch {
    default_limit: Option<usize>,
    max_limit: Option<usize>,
    ttl_days: Option<i64>,
    seed_demo_data: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
