use super::{
    grid::GridConfig,
    mutation::MutationConfig,
    traits::{ConfigManifest, ConfigSection},
};
use crate::error::CgpError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Environment prefix used by `ConfigManager::load_layered` callers by default
pub const ENV_PREFIX: &str = "CGP";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub grid: GridConfig,
    pub mutation: MutationConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), CgpError> {
        self.grid.validate()?;
        self.mutation.validate()?;
        Ok(())
    }

    pub fn manifests(&self) -> Result<Vec<ConfigManifest>, CgpError> {
        Ok(vec![self.grid.to_manifest()?, self.mutation.to_manifest()?])
    }
}

fn poisoned<T>(_: T) -> CgpError {
    CgpError::Configuration("Configuration lock poisoned".to_string())
}

#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CgpError> {
        let contents = std::fs::read_to_string(path)?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| CgpError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.config.write().map_err(poisoned)? = config;
        Ok(())
    }

    /// TOML file first, then `<PREFIX>_SECTION__FIELD` environment variables
    /// (e.g. `CGP_GRID__ROWS=5`)
    pub fn load_layered<P: AsRef<Path>>(&self, path: P, env_prefix: &str) -> Result<(), CgpError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(false))
            .add_source(
                ::config::Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: AppConfig = settings.try_deserialize()?;

        config.validate()?;
        log::info!("Loaded layered configuration from {}", path.as_ref().display());

        *self.config.write().map_err(poisoned)? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CgpError> {
        let config = self.config.read().map_err(poisoned)?;
        let toml_str = toml::to_string_pretty(&*config)
            .map_err(|e| CgpError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| CgpError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Every section's field listing as pretty JSON
    pub fn manifest_json(&self) -> Result<String, CgpError> {
        let manifests = self.config.read().map_err(poisoned)?.manifests()?;
        Ok(serde_json::to_string_pretty(&manifests)?)
    }

    pub fn get(&self) -> Result<AppConfig, CgpError> {
        Ok(self.config.read().map_err(poisoned)?.clone())
    }

    /// Apply `f` to a copy; the stored configuration only changes if the copy validates
    pub fn update<F>(&self, f: F) -> Result<(), CgpError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().map_err(poisoned)?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}
