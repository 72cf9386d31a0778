use crate::utils::error::{BrokerError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_required_field,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_DEPLOY_PROGRAM: &str = "node";
pub const DEFAULT_DEPLOY_TIMEOUT_SECONDS: u64 = 300;

/// 未知的 section 直接報錯，避免設定被悄悄忽略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    #[serde(default)]
    pub backend: BackendSection,
    pub docker: Option<DockerConfig>,
    pub kubernetes: Option<KubernetesConfig>,
    pub deployer: DeployerConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Docker,
    Kubernetes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(default)]
    pub kind: BackendKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockerConfig {
    /// 未設定時使用 DOCKER_SERVER 環境變數，再退回 127.0.0.1
    pub internal_address: Option<String>,
    pub external_address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubernetesConfig {
    pub host: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployerConfig {
    pub program: Option<String>,
    pub script: PathBuf,
    pub timeout_seconds: Option<u64>,
}

impl DockerConfig {
    pub fn internal_address(&self) -> String {
        self.internal_address
            .clone()
            .filter(|address| !address.is_empty())
            .or_else(|| std::env::var("DOCKER_SERVER").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }
}

impl KubernetesConfig {
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }
}

impl DeployerConfig {
    pub fn program(&self) -> &str {
        self.program.as_deref().unwrap_or(DEFAULT_DEPLOY_PROGRAM)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(DEFAULT_DEPLOY_TIMEOUT_SECONDS)
    }
}

impl BrokerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| BrokerError::ConfigError {
            message: format!(
                "Error opening config file {}: {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BrokerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("Error parsing config file: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DOCKER_EXTERNAL_ADDRESS})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BrokerError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind
    }
}

impl Validate for BrokerConfig {
    fn validate(&self) -> Result<()> {
        let script = self.deployer.script.to_string_lossy();
        validate_path("deployer.script", &script)?;
        validate_non_empty_string("deployer.program", self.deployer.program())?;
        validate_positive_number("deployer.timeout_seconds", self.deployer.timeout_seconds(), 1)?;

        match self.backend_kind() {
            BackendKind::Docker => {
                let docker = validate_required_field("docker", &self.docker)?;
                validate_non_empty_string("docker.external_address", &docker.external_address)?;
            }
            BackendKind::Kubernetes => {
                let kubernetes = validate_required_field("kubernetes", &self.kubernetes)?;
                validate_non_empty_string("kubernetes.host", &kubernetes.host)?;
                validate_non_empty_string("kubernetes.namespace", kubernetes.namespace())?;
            }
        }

        Ok(())
    }
}
