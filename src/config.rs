use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::WeaveError;
use crate::ir::RUNTIME_MODULE;
use crate::runtime::{HostConfig, HostMode};
use crate::weave::WeaveOptions;

/// Project configuration file name, looked up next to the build output.
pub const CONFIG_FILE: &str = "prewire.toml";

/// Environment override for `runtime.introspection_fallback`.
pub const FALLBACK_ENV: &str = "PREWIRE_FALLBACK";

/// Default simple name of the synthesized registrar type.
pub const DEFAULT_REGISTRAR_NAME: &str = "PrewireRegistrar";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub weave: WeaveSection,
    pub runtime: RuntimeSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeaveSection {
    /// Module that hosts the injection runtime. It is never woven itself and
    /// only modules referencing it are woven.
    pub runtime_module: String,
    /// Simple name of the synthesized registrar type, prefixed with the module name.
    pub registrar_name: String,
}

impl Default for WeaveSection {
    fn default() -> Self {
        Self {
            runtime_module: RUNTIME_MODULE.to_string(),
            registrar_name: DEFAULT_REGISTRAR_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSection {
    /// Synthesize missing registry entries from live type tables.
    pub introspection_fallback: bool,
    pub mode: HostMode,
}

impl Config {
    /// Parse a config from TOML text. `path` is only used for error reporting.
    pub fn from_toml_str(text: &str, path: Option<&Path>) -> Result<Self, WeaveError> {
        let config: Config = toml::from_str(text)
            .map_err(|e| WeaveError::config(format!("invalid {CONFIG_FILE}: {e}"), path.map(Path::to_path_buf)))?;
        config.validate(path)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, WeaveError> {
        let text = std::fs::read_to_string(path).map_err(|e| WeaveError::io(path, e))?;
        Self::from_toml_str(&text, Some(path))
    }

    /// Load `prewire.toml` from `dir` if present, otherwise defaults. The
    /// environment override is applied in both cases.
    pub fn discover(dir: &Path) -> Result<Self, WeaveError> {
        let candidate: PathBuf = dir.join(CONFIG_FILE);
        let config = if candidate.is_file() { Self::load(&candidate)? } else { Self::default() };
        config.with_env_override(std::env::var(FALLBACK_ENV).ok().as_deref())
    }

    /// Apply the value of `PREWIRE_FALLBACK`, if set.
    pub fn with_env_override(mut self, value: Option<&str>) -> Result<Self, WeaveError> {
        let Some(value) = value else {
            return Ok(self);
        };
        self.runtime.introspection_fallback = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" | "" => false,
            other => {
                return Err(WeaveError::config(
                    format!("{FALLBACK_ENV}: expected a boolean, got '{other}'"),
                    None,
                ));
            }
        };
        Ok(self)
    }

    pub fn host_config(&self) -> HostConfig {
        HostConfig {
            mode: self.runtime.mode,
            introspection_fallback: self.runtime.introspection_fallback,
        }
    }

    pub fn weave_options(&self, editor_only: bool) -> WeaveOptions {
        WeaveOptions {
            editor_only,
            registrar_name: self.weave.registrar_name.clone(),
        }
    }

    fn validate(&self, path: Option<&Path>) -> Result<(), WeaveError> {
        let path = || path.map(Path::to_path_buf);
        if self.weave.runtime_module.trim().is_empty() {
            return Err(WeaveError::config("weave.runtime_module must not be empty", path()));
        }
        let name = &self.weave.registrar_name;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(WeaveError::config(
                format!("weave.registrar_name '{name}' is not a simple identifier"),
                path(),
            ));
        }
        Ok(())
    }
}
