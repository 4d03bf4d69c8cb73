//! Application configuration for footprint.
//!
//! User config lives at `~/.footprint/footprint.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FootprintError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "footprint.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".footprint";

/// User-Agent presented by both fetch paths.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching footprint.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Audit loop settings.
    #[serde(default)]
    pub audit: AuditSection,

    /// Fetcher settings.
    #[serde(default)]
    pub fetch: FetchSection,

    /// Oracle (OpenRouter) settings.
    #[serde(default)]
    pub oracle: OracleSection,
}

/// `[audit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSection {
    /// What the audit is looking for, passed verbatim to the oracle.
    #[serde(default = "default_goal")]
    pub goal: String,

    /// URLs processed concurrently per scrape round.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Hard ceiling on state-machine steps.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Directory audit reports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            goal: default_goal(),
            batch_size: default_batch_size(),
            max_steps: default_max_steps(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_goal() -> String {
    "Full Resume Audit".into()
}
fn default_batch_size() -> usize {
    2
}
fn default_max_steps() -> u32 {
    50
}
fn default_output_dir() -> String {
    "output".into()
}

/// Which backend drives the rendered fetch path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless Chromium (JavaScript executed).
    #[default]
    Chromium,
    /// Plain HTTP GET (no JavaScript).
    Http,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSection {
    /// Timeout for the direct (raw file) fetch path.
    #[serde(default = "default_direct_timeout")]
    pub direct_timeout_secs: u64,

    /// Navigation timeout for the rendered path.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Fixed delay after navigation so client-side frameworks can hydrate.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Maximum scroll-to-bottom iterations.
    #[serde(default = "default_scroll_iterations")]
    pub scroll_iterations: u32,

    /// Delay after each scroll.
    #[serde(default = "default_scroll_delay")]
    pub scroll_delay_ms: u64,

    /// Rendered-path backend.
    #[serde(default)]
    pub renderer: RendererKind,

    /// Run Chromium without a window.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Explicit Chromium binary; auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,

    /// User-Agent header for the HTTP client.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            direct_timeout_secs: default_direct_timeout(),
            navigation_timeout_ms: default_navigation_timeout(),
            settle_delay_ms: default_settle_delay(),
            scroll_iterations: default_scroll_iterations(),
            scroll_delay_ms: default_scroll_delay(),
            renderer: RendererKind::default(),
            headless: true,
            chrome_path: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_direct_timeout() -> u64 {
    10
}
fn default_navigation_timeout() -> u64 {
    20_000
}
fn default_settle_delay() -> u64 {
    2_000
}
fn default_scroll_iterations() -> u32 {
    5
}
fn default_scroll_delay() -> u64 {
    1_000
}
fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

/// `[oracle]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSection {
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for classification and extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Attempts per call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Backoff cap.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Concurrent in-flight oracle requests.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            temperature: default_temperature(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            max_concurrent_requests: default_max_concurrent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-5-mini".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_attempts() -> u32 {
    4
}
fn default_base_delay() -> u64 {
    1_000
}
fn default_max_delay() -> u64 {
    16_000
}
fn default_max_concurrent() -> usize {
    4
}
fn default_request_timeout() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime audit configuration.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Goal text passed to the oracle.
    pub goal: String,
    /// URLs drained per dispatch step.
    pub batch_size: usize,
    /// Hard step ceiling.
    pub max_steps: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for AuditConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            goal: config.audit.goal.clone(),
            batch_size: config.audit.batch_size.max(1),
            max_steps: config.audit.max_steps,
        }
    }
}

/// Runtime fetch configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub direct_timeout: Duration,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
    pub scroll_iterations: u32,
    pub scroll_delay: Duration,
    pub renderer: RendererKind,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        let f = &config.fetch;
        Self {
            direct_timeout: Duration::from_secs(f.direct_timeout_secs),
            navigation_timeout: Duration::from_millis(f.navigation_timeout_ms),
            settle_delay: Duration::from_millis(f.settle_delay_ms),
            scroll_iterations: f.scroll_iterations,
            scroll_delay: Duration::from_millis(f.scroll_delay_ms),
            renderer: f.renderer,
            headless: f.headless,
            chrome_path: f.chrome_path.as_ref().map(PathBuf::from),
            user_agent: f.user_agent.clone(),
        }
    }
}

/// Runtime oracle configuration. Holds the resolved API key.
#[derive(Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_concurrent_requests: usize,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl OracleConfig {
    /// Build from the `[oracle]` section, reading the key from its env var.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        validate_api_key(config)?;
        let o = &config.oracle;
        let api_key = std::env::var(&o.api_key_env).unwrap_or_default();
        Ok(Self::with_api_key(config, api_key))
    }

    /// Build with an explicit key (tests, embedding).
    pub fn with_api_key(config: &AppConfig, api_key: impl Into<String>) -> Self {
        let o = &config.oracle;
        Self {
            base_url: o.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: o.model.clone(),
            temperature: o.temperature,
            max_attempts: o.max_attempts.max(1),
            base_delay: Duration::from_millis(o.base_delay_ms),
            max_delay: Duration::from_millis(o.max_delay_ms),
            max_concurrent_requests: o.max_concurrent_requests.max(1),
            request_timeout: Duration::from_secs(o.request_timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.footprint/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FootprintError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.footprint/footprint.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FootprintError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| FootprintError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FootprintError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FootprintError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FootprintError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the oracle API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.oracle.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(FootprintError::config(format!(
            "oracle API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("batch_size"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(!toml_str.contains("chrome_path"));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let toml_str = r#"
[audit]
max_steps = 10

[fetch]
renderer = "http"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.audit.max_steps, 10);
        assert_eq!(config.audit.batch_size, 2);
        assert_eq!(config.fetch.renderer, RendererKind::Http);
        assert_eq!(config.fetch.scroll_iterations, 5);
        assert_eq!(config.oracle.max_attempts, 4);
    }

    #[test]
    fn runtime_configs_from_app_config() {
        let mut app = AppConfig::default();
        app.audit.batch_size = 0;
        let audit = AuditConfig::from(&app);
        assert_eq!(audit.batch_size, 1);
        assert_eq!(audit.max_steps, 50);

        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.direct_timeout, Duration::from_secs(10));
        assert_eq!(fetch.navigation_timeout, Duration::from_millis(20_000));
    }

    #[test]
    fn oracle_config_redacts_key() {
        let config = OracleConfig::with_api_key(&AppConfig::default(), "sk-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert_eq!(config.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.oracle.api_key_env = "FP_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
