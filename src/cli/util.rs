//! CLI Common Utilities
//!
//! Shared initialization for commands that run the pipeline: configuration,
//! credential resolution and provider construction happen once here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::ai::{ProviderConfig, SharedProvider, create_provider};
use crate::config::{Config, ConfigLoader, PipelineSettings};
use crate::pipeline::NarrativePipeline;
use crate::report::MarkdownExporter;
use crate::types::Result;

/// Command execution context
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub settings: Arc<PipelineSettings>,
    pub provider: Option<SharedProvider>,
}

impl CommandContext {
    /// Load configuration and connect the provider
    ///
    /// `config_path` replaces the layered lookup with a single file. A missing
    /// credential is not an error: the pipeline runs on the template narrative.
    pub fn load(config_path: Option<&Path>, offline: bool) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        if offline {
            config.generation.offline_mode = true;
        }

        let api_key = if config.generation.offline_mode {
            None
        } else {
            ConfigLoader::resolve_api_key(&config.llm)
        };

        let provider = match &api_key {
            Some(key) => connect_provider(&config, key),
            None if config.generation.offline_mode => None,
            None => {
                warn!(
                    "No API key found ({}); reports will use the template narrative",
                    ConfigLoader::api_key_vars(&config.llm.provider).join(" or ")
                );
                None
            }
        };

        let settings = Arc::new(PipelineSettings::from_config(&config));

        Ok(Self {
            config,
            settings,
            provider,
        })
    }

    pub fn pipeline(&self) -> NarrativePipeline {
        NarrativePipeline::new(Arc::clone(&self.settings), self.provider.clone())
    }

    /// Exporter rooted at `output`, or the configured directory
    pub fn exporter(&self, output: Option<PathBuf>) -> MarkdownExporter {
        MarkdownExporter::new(output.unwrap_or_else(|| self.config.output.dir.clone()))
    }
}

fn connect_provider(config: &Config, api_key: &str) -> Option<SharedProvider> {
    let provider_config = ProviderConfig::from_llm(&config.llm, Some(api_key.to_string()));
    match create_provider(&provider_config) {
        Ok(provider) => {
            debug!("Using provider {} ({})", provider.name(), provider.model());
            Some(provider)
        }
        Err(e) => {
            warn!("Provider unavailable, using template narrative: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_offline_flag_skips_provider() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[llm]\napi_key = \"test-key\"\n").unwrap();

        let ctx = CommandContext::load(Some(&path), true).unwrap();
        assert!(ctx.provider.is_none());
        assert!(ctx.settings.offline_mode);
    }

    #[test]
    fn test_configured_key_builds_provider() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[llm]\nprovider = \"openai\"\nmodel = \"gpt-4o-mini\"\napi_key = \"sk-test\"\n",
        )
        .unwrap();

        let ctx = CommandContext::load(Some(&path), false).unwrap();
        let provider = ctx.provider.as_ref().unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert!(!ctx.settings.offline_mode);
    }

    #[test]
    fn test_exporter_defaults_to_config_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[output]\ndir = \"out\"\n").unwrap();

        let ctx = CommandContext::load(Some(&path), true).unwrap();
        assert_eq!(ctx.exporter(None).output_dir(), Path::new("out"));
        assert_eq!(
            ctx.exporter(Some(PathBuf::from("elsewhere"))).output_dir(),
            Path::new("elsewhere")
        );
    }
}
