pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use catalog::load_catalog;
pub use toml_config::{
    BackendKind, BrokerConfig, DeployerConfig, DockerConfig, KubernetesConfig,
};
