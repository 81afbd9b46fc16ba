// pakt-core/src/config.rs

//! Session configuration: the TOML file plus command-line overrides.

use serde::Deserialize;
use std::path::PathBuf;

use crate::errors::{PaktError, Result};
use crate::prompt::{PromptSettings, YesNoLocale};

const DEFAULT_RETRY_TIMEOUT: u64 = 30;
const MAX_RETRY_TIMEOUT: u64 = 3600;

#[derive(Deserialize, Debug, Clone)]
pub struct SessionConfig {
    /// Answer every prompt with its default.
    #[serde(default)]
    pub non_interactive: bool,
    #[serde(default)]
    pub machine_readable: bool,
    /// Don't treat unknown package names or capabilities as an error.
    #[serde(default)]
    pub ignore_unknown: bool,
    #[serde(default)]
    pub no_color: bool,
    /// Seconds an "Abort, retry, ignore?" prompt waits before retrying.
    #[serde(default = "default_retry_timeout")]
    pub retry_timeout: u64,
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LocaleConfig {
    pub yes: String,
    pub no: String,
    pub yes_expr: String,
    pub no_expr: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
    pub state: Option<PathBuf>,
}

fn default_retry_timeout() -> u64 {
    DEFAULT_RETRY_TIMEOUT
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            yes: "yes".to_string(),
            no: "no".to_string(),
            yes_expr: "^[yY]".to_string(),
            no_expr: "^[nN]".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            non_interactive: false,
            machine_readable: false,
            ignore_unknown: false,
            no_color: false,
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
            locale: LocaleConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(content: &str) -> Result<SessionConfig> {
        let config: SessionConfig = match toml::from_str(content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse configuration TOML.");
                return Err(PaktError::config(format!(
                    "Failed to parse configuration TOML content. Check TOML syntax: {}",
                    e
                )));
            }
        };

        if config.locale.yes.trim().is_empty() || config.locale.no.trim().is_empty() {
            return Err(PaktError::config("'locale.yes' and 'locale.no' must not be empty."));
        }
        if config.locale.yes == config.locale.no {
            return Err(PaktError::config("'locale.yes' and 'locale.no' must differ."));
        }
        // compile once here so a bad expression is reported at load time
        config.yes_no_locale()?;
        if config.retry_timeout > MAX_RETRY_TIMEOUT {
            return Err(PaktError::config(format!(
                "'retry_timeout' is {} seconds, the maximum is {}.",
                config.retry_timeout, MAX_RETRY_TIMEOUT
            )));
        }

        tracing::info!("Successfully parsed and validated session configuration.");
        Ok(config)
    }

    pub fn yes_no_locale(&self) -> Result<YesNoLocale> {
        let l = &self.locale;
        YesNoLocale::new(l.yes.clone(), l.no.clone(), &l.yes_expr, &l.no_expr)
            .map_err(|e| PaktError::config(format!("Invalid yes/no expression in [locale]: {}", e)))
    }

    pub fn prompt_settings(&self) -> Result<PromptSettings> {
        Ok(PromptSettings {
            non_interactive: self.non_interactive,
            machine_readable: self.machine_readable,
            locale: self.yes_no_locale()?,
        })
    }
}
