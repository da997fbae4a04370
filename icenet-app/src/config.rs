//! Orchestrator configuration loader.

use icenet_executor::{CommandRunner, Privilege};
use icenet_install::{InstallBackend, InstallConfig, DEFAULT_BACKEND_SCRIPT, DEFAULT_LIVE_BOOT_MARKER};
use icenet_services::{
    CatalogError, MissingSensorProbe, ServiceCatalog, ServiceRef, ServiceStateProbe,
    UnitController,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/icenet/orchestrator.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Config file is empty: {}", .0.display())]
    Empty(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Invalid service catalog: {0}")]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    pub services: Vec<ServiceRef>,
    pub privilege: Privilege,
    pub probe_timeout_secs: u64,
    pub action_timeout_secs: u64,
    pub journal_lines: usize,
    pub backend_script: PathBuf,
    pub live_boot_marker: PathBuf,
    pub install_defaults: InstallConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            services: ServiceCatalog::icenet_default().iter().cloned().collect(),
            privilege: Privilege::default(),
            probe_timeout_secs: 10,
            action_timeout_secs: 60,
            journal_lines: 20,
            backend_script: PathBuf::from(DEFAULT_BACKEND_SCRIPT),
            live_boot_marker: PathBuf::from(DEFAULT_LIVE_BOOT_MARKER),
            install_defaults: InstallConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "probe_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.action_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "action_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.journal_lines == 0 {
            return Err(ConfigError::Invalid(
                "journal_lines must be greater than zero".to_string(),
            ));
        }
        if self.install_defaults.disk_path.is_some() {
            return Err(ConfigError::Invalid(
                "install_defaults cannot preselect a disk".to_string(),
            ));
        }
        self.catalog()?;
        Ok(())
    }

    pub fn catalog(&self) -> Result<ServiceCatalog, CatalogError> {
        ServiceCatalog::new(self.services.clone())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }

    pub fn backend(&self) -> InstallBackend {
        InstallBackend::new(self.backend_script.clone())
    }

    /// Controller wired with this config's catalog, timeouts and privilege.
    pub fn controller(&self, runner: Arc<dyn CommandRunner>) -> Result<UnitController, ConfigError> {
        let catalog = Arc::new(self.catalog()?);
        let probe = ServiceStateProbe::new(Arc::clone(&runner)).with_timeout(self.probe_timeout());
        let diagnostics = MissingSensorProbe::new(self.journal_lines).with_timeout(self.probe_timeout());

        Ok(UnitController::new(runner, catalog)
            .with_probe(probe)
            .with_privilege(self.privilege)
            .with_action_timeout(self.action_timeout())
            .with_diagnostics(vec![Box::new(diagnostics)]))
    }
}

/// Load and validate a YAML config file.
pub fn load_config(path: &Path) -> Result<OrchestratorConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Err(ConfigError::Empty(path.to_path_buf()));
    }

    let config: OrchestratorConfig = serde_yaml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// An explicit path must exist. Without one, the system-wide file is used
/// when present and built-in defaults otherwise.
pub fn resolve_config(explicit: Option<&Path>) -> Result<OrchestratorConfig, ConfigError> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)
            } else {
                Ok(OrchestratorConfig::default())
            }
        }
    }
}
