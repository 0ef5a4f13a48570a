use super::{
    distributed::DistributedSettings,
    evolution::EvolutionSettings,
    network::NetworkSettings,
    speciation::SpeciationSettings,
    traits::ConfigSection,
};
use crate::error::{DistevoError, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix of environment overrides, e.g. `DISTEVO_EVOLUTION__MAX_GENOMES=500`
pub const ENV_PREFIX: &str = "DISTEVO";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionSettings,
    pub speciation: SpeciationSettings,
    pub distributed: DistributedSettings,
    pub network: NetworkSettings,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.evolution.validate()?;
        self.speciation.validate()?;
        self.distributed.validate()?;
        self.network.validate()?;
        Ok(())
    }
}

#[derive(Default)]
pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML file with `DISTEVO_*` environment variables layered on top
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        log::info!("loaded configuration from {}", path.display());
        *self.write_lock()? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = self.get()?;
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| DistevoError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig> {
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(|_| DistevoError::Invariant("configuration lock poisoned".to_string()))
    }

    /// Apply `f` and keep the result only if it still validates
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.write_lock()?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, AppConfig>> {
        self.config
            .write()
            .map_err(|_| DistevoError::Invariant("configuration lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::speciation::StrategyKind;

    #[test]
    fn test_defaults_validate() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejected_update_leaves_config_untouched() {
        let manager = ConfigManager::new();
        let result = manager.update(|c| c.distributed.worker_count = 0);
        assert!(matches!(result, Err(DistevoError::Configuration(_))));
        assert_eq!(manager.get().unwrap().distributed.worker_count, 4);
    }

    #[test]
    fn test_partial_file_keeps_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distevo.toml");
        std::fs::write(&path, "[speciation]\nstrategy = \"neat\"\nspecies_threshold = 0.5\n").unwrap();

        let manager = ConfigManager::new();
        manager.load_from_file(&path).unwrap();
        let config = manager.get().unwrap();
        assert_eq!(config.speciation.strategy, StrategyKind::Neat);
        assert_eq!(config.speciation.species_threshold, 0.5);
        assert_eq!(config.evolution, EvolutionSettings::default());
    }

    #[test]
    fn test_zero_rates_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distevo.toml");
        std::fs::write(
            &path,
            "[speciation]\nmutation_rate = 0.0\nintra_group_crossover_rate = 0.0\ninter_group_crossover_rate = 0.0\n",
        )
        .unwrap();

        let manager = ConfigManager::new();
        assert!(manager.load_from_file(&path).is_err());
    }
}
