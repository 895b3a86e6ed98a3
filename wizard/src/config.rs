// Wizard configuration
//
// Layered with the `config` crate: built-in defaults, then an optional TOML file, then
// `ANALYTICS_WIZARD__*` environment variables (e.g. `ANALYTICS_WIZARD__BACKEND_URL`).

use anyhow::{Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "analytics-wizard.toml";
pub const ENV_PREFIX: &str = "ANALYTICS_WIZARD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Base URL of the analytics backend; API paths are resolved against it.
    pub backend_url: String,
    /// Port pre-filled in the connect form.
    pub default_port: u16,
    pub request_timeout_secs: u64,
    /// Pause between a successful connect and the table listing request.
    pub collections_delay_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000".to_string(),
            default_port: 3306,
            request_timeout_secs: 30,
            collections_delay_ms: 500,
            log_dir: None,
        }
    }
}

impl WizardConfig {
    /// Load the effective configuration.
    ///
    /// An explicit `path` must exist; without one, `analytics-wizard.toml` in the working
    /// directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, true)
    }

    fn load_with_env(path: Option<&Path>, with_env: bool) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("backend_url", defaults.backend_url.clone())?
            .set_default("default_port", i64::from(defaults.default_port))?
            .set_default(
                "request_timeout_secs",
                i64::try_from(defaults.request_timeout_secs).unwrap_or(30),
            )?
            .set_default(
                "collections_delay_ms",
                i64::try_from(defaults.collections_delay_ms).unwrap_or(500),
            )?;

        builder = match path {
            Some(p) => builder.add_source(File::from(p).format(FileFormat::Toml).required(true)),
            None => builder.add_source(
                File::with_name(DEFAULT_CONFIG_FILE)
                    .format(FileFormat::Toml)
                    .required(false),
            ),
        };

        if with_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let cfg: WizardConfig = builder
            .build()
            .context("Failed to read wizard configuration")?
            .try_deserialize()
            .context("Invalid wizard configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.backend_url)
            .with_context(|| format!("backend_url is not a valid URL: {}", self.backend_url))?;
        if self.default_port == 0 {
            anyhow::bail!("default_port must be between 1 and 65535");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn collections_delay(&self) -> Duration {
        Duration::from_millis(self.collections_delay_ms)
    }

    /// Render as TOML (used by `--print-config`).
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}
