//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/laporan/config.toml)
//! 3. Project config (.laporan/config.toml)
//! 4. Environment variables (LAPORAN_* prefix, `__` between sections)

use directories::BaseDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::{Config, LlmConfig};
use crate::types::{ReportError, Result};

const APP_DIR: &str = "laporan";
const PROJECT_DIR: &str = ".laporan";
const ENV_PREFIX: &str = "LAPORAN_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_layers(Self::global_config_path(), &Self::project_config_path())
    }

    fn load_layers(global: Option<PathBuf>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // LAPORAN_LLM__TIMEOUT_SECS -> llm.timeout_secs
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| ReportError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| ReportError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Global config directory; `XDG_CONFIG_HOME` wins over the OS default
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
            .map(|p| p.join(APP_DIR))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(PROJECT_DIR)
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Resolve the provider API key
    ///
    /// Order: config file, provider environment variable, `.env` in the
    /// working directory.
    pub fn resolve_api_key(llm: &LlmConfig) -> Option<String> {
        if let Some(key) = llm.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.trim().to_string());
        }

        let names = Self::api_key_vars(&llm.provider);

        for name in names {
            if let Ok(value) = env::var(name)
                && !value.trim().is_empty()
            {
                debug!("Using API key from {}", name);
                return Some(value.trim().to_string());
            }
        }

        let dotenv = fs::read_to_string(".env").ok()?;
        names.iter().find_map(|name| {
            let value = parse_dotenv(&dotenv, name);
            if value.is_some() {
                debug!("Using API key {} from .env", name);
            }
            value
        })
    }

    /// Environment variables consulted for a provider's key
    pub fn api_key_vars(provider: &str) -> &'static [&'static str] {
        match provider.to_lowercase().as_str() {
            "openai" => &["OPENAI_API_KEY"],
            _ => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        }
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| ReportError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            ReportError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_config(&global_dir, Self::default_global_config(), force)?;
        Ok(global_dir)
    }

    /// Initialize project configuration in the working directory
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let project_dir = Self::project_dir();
        Self::write_config(&project_dir, Self::default_project_config(), force)?;
        Ok(project_dir)
    }

    fn write_config(dir: &Path, content: &str, force: bool) -> Result<()> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, content)?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }
        Ok(())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_global_config() -> &'static str {
        r#"# Laporan Global Configuration
# User-wide defaults. Project settings in .laporan/config.toml override these.

version = "1.0"

[llm]
provider = "gemini"
model = "gemini-2.5-flash"
timeout_secs = 30
temperature = 0.7
# API key is read from GEMINI_API_KEY (or OPENAI_API_KEY for provider = "openai")

[generation]
max_retries = 3
backoff_base_ms = 1000
backoff_max_ms = 30000
jitter = true
offline_mode = false
fallback_on_auth_error = false
"#
    }

    fn default_project_config() -> &'static str {
        r#"# Laporan Project Configuration
# Project-specific settings that override global defaults.

version = "1.0"

[validation]
tolerance_pct = 2.0
min_narrative_words = 5

[prompt]
max_chars = 12000

[output]
dir = "reports"
"#
    }
}

/// Value of `key` in `.env` style content (`KEY=value`, optional quotes and `export`)
fn parse_dotenv(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (name, value) = line.split_once('=')?;
        if name.trim() != key {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_files() {
        let temp = TempDir::new().unwrap();
        let config =
            ConfigLoader::load_layers(None, &temp.path().join("missing.toml")).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.generation.max_retries, 3);
    }

    #[test]
    fn test_project_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        let project = temp.path().join("project.toml");

        fs::write(
            &global,
            "[generation]\nmax_retries = 5\nbackoff_base_ms = 10\n[prompt]\nmax_chars = 9000\n",
        )
        .unwrap();
        fs::write(&project, "[generation]\nmax_retries = 2\n").unwrap();

        let config = ConfigLoader::load_layers(Some(global), &project).unwrap();
        assert_eq!(config.generation.max_retries, 2);
        assert_eq!(config.generation.backoff_base_ms, 10);
        assert_eq!(config.prompt.max_chars, 9000);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[validation]\ntolerance_pct = 250.0\n").unwrap();

        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn test_default_templates_parse() {
        let temp = TempDir::new().unwrap();
        for (name, content) in [
            ("global.toml", ConfigLoader::default_global_config()),
            ("project.toml", ConfigLoader::default_project_config()),
        ] {
            let path = temp.path().join(name);
            fs::write(&path, content).unwrap();
            assert!(ConfigLoader::load_from_file(&path).is_ok(), "{} must load", name);
        }
    }

    #[test]
    fn test_write_config_respects_force() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".laporan");

        ConfigLoader::write_config(&dir, "version = \"1.0\"\n", false).unwrap();
        ConfigLoader::write_config(&dir, "# replaced\n", false).unwrap();
        let content = fs::read_to_string(dir.join("config.toml")).unwrap();
        assert!(content.starts_with("version"));

        ConfigLoader::write_config(&dir, "# replaced\n", true).unwrap();
        let content = fs::read_to_string(dir.join("config.toml")).unwrap();
        assert!(content.starts_with("# replaced"));
    }

    #[test]
    fn test_config_key_takes_precedence() {
        let llm = LlmConfig {
            api_key: Some("from-config".to_string()),
            ..LlmConfig::default()
        };
        assert_eq!(
            ConfigLoader::resolve_api_key(&llm).as_deref(),
            Some("from-config")
        );
    }

    #[test]
    fn test_api_key_vars_per_provider() {
        assert_eq!(ConfigLoader::api_key_vars("openai"), &["OPENAI_API_KEY"]);
        assert_eq!(ConfigLoader::api_key_vars("Gemini")[0], "GEMINI_API_KEY");
    }

    #[test]
    fn test_parse_dotenv() {
        let content = "# comment\nOTHER=1\nexport GEMINI_API_KEY=\"abc123\"\nOPENAI_API_KEY='sk-x'\nEMPTY=\n";
        assert_eq!(parse_dotenv(content, "GEMINI_API_KEY").as_deref(), Some("abc123"));
        assert_eq!(parse_dotenv(content, "OPENAI_API_KEY").as_deref(), Some("sk-x"));
        assert_eq!(parse_dotenv(content, "EMPTY"), None);
        assert_eq!(parse_dotenv(content, "MISSING"), None);
    }
}
