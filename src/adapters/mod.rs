// Adapters layer: container backends behind the ContainerManager port.

pub mod docker;
pub mod kubernetes;

pub use docker::{DockerClient, DockerContainerManager};
pub use kubernetes::{KubeClient, KubernetesContainerManager, NamespacedClient};

use crate::config::toml_config::{BackendKind, BrokerConfig};
use crate::domain::ports::ContainerManager;
use crate::utils::validation::validate_required_field;
use crate::utils::error::Result;
use std::sync::Arc;

/// 依照設定的 backend 建立 container manager，只在啟動時呼叫一次
pub async fn container_manager_from_config(
    config: &BrokerConfig,
) -> Result<Arc<dyn ContainerManager>> {
    match config.backend_kind() {
        BackendKind::Docker => {
            let docker = validate_required_field("docker", &config.docker)?;
            let client = bollard::Docker::connect_with_local_defaults()?;
            let internal_address = docker.internal_address();
            tracing::info!(%internal_address, "using docker backend");
            Ok(Arc::new(DockerContainerManager::new(
                client,
                internal_address,
                docker.external_address.clone(),
            )))
        }
        BackendKind::Kubernetes => {
            let kubernetes = validate_required_field("kubernetes", &config.kubernetes)?;
            let client = kube::Client::try_default().await?;
            tracing::info!(namespace = kubernetes.namespace(), "using kubernetes backend");
            Ok(Arc::new(KubernetesContainerManager::new(
                NamespacedClient::new(client, kubernetes.namespace()),
                kubernetes.host.clone(),
            )))
        }
    }
}
