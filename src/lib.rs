pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{container_manager_from_config, DockerContainerManager, KubernetesContainerManager};
pub use config::{load_catalog, BrokerConfig};
pub use core::{broker::Broker, deployer::ToolDeployer};
pub use utils::error::{BrokerError, Result};
