// ABOUTME: Project configuration types and parsing for terrane.yml.
// ABOUTME: Handles infra paths, target defaults and retry/progress tuning.

mod param_file;
mod tuning;

pub use param_file::{ParameterFile, substitute_env};
pub use tuning::{ProgressConfig, RetryConfig};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "terrane.yml";
pub const CONFIG_FILENAME_ALT: &str = "terrane.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".terrane/config.yml";

/// Config-store key prefix for saved parameter values.
pub const PARAMETERS_KEY_PREFIX: &str = "infra.parameters";
/// Environment key holding the session's shared location.
pub const LOCATION_ENV_KEY: &str = "AZURE_LOCATION";
/// Environment key holding the target resource group.
pub const RESOURCE_GROUP_ENV_KEY: &str = "AZURE_RESOURCE_GROUP";
/// Environment key holding the target subscription.
pub const SUBSCRIPTION_ENV_KEY: &str = "AZURE_SUBSCRIPTION_ID";

const DEFAULT_PORTAL_URL: &str = "https://portal.azure.com";

/// Config-store key for a saved parameter value.
pub fn parameter_config_key(name: &str) -> String {
    format!("{PARAMETERS_KEY_PREFIX}.{name}")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub infra: InfraConfig,

    #[serde(default)]
    pub subscription: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub resource_group: Option<String>,

    #[serde(default = "default_portal_url")]
    pub portal_url: String,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub progress: ProgressConfig,

    /// Directory the config was loaded from; infra paths are relative to it.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfraConfig {
    #[serde(default = "default_infra_path")]
    pub path: PathBuf,

    #[serde(default = "default_module")]
    pub module: String,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            path: default_infra_path(),
            module: default_module(),
        }
    }
}

fn default_infra_path() -> PathBuf {
    PathBuf::from("infra")
}

fn default_module() -> String {
    "main".to_string()
}

fn default_portal_url() -> String {
    DEFAULT_PORTAL_URL.to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: None,
            infra: InfraConfig::default(),
            subscription: None,
            location: None,
            resource_group: None,
            portal_url: default_portal_url(),
            retry: RetryConfig::default(),
            progress: ProgressConfig::default(),
            root: PathBuf::new(),
        }
    }
}

impl ProjectConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(Error::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.root = config_root(path);
        Ok(config)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                let mut config = Self::load(path)?;
                config.root = dir.to_path_buf();
                return Ok(config);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.infra.module.trim().is_empty() {
            return Err(Error::InvalidConfig("infra.module cannot be empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn infra_dir(&self) -> PathBuf {
        let path = if self.infra.path.as_os_str().is_empty() {
            default_infra_path()
        } else {
            self.infra.path.clone()
        };
        self.root.join(path)
    }

    /// Path handed to the template compiler, without extension.
    pub fn module_path(&self) -> PathBuf {
        self.infra_dir().join(&self.infra.module)
    }

    /// `<infra>/<module>.parameters.json`
    pub fn parameters_file_path(&self) -> PathBuf {
        self.infra_dir()
            .join(format!("{}.parameters.json", self.infra.module))
    }
}

fn config_root(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    if parent.ends_with(".terrane") {
        parent.parent().unwrap_or(Path::new("")).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}
