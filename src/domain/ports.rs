use crate::domain::model::{BindConfig, ContainerConfig, ContainerInfo, ContractInfo, NodeInfo};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Backend capability set. Docker and Kubernetes each implement it on their own.
#[async_trait]
pub trait ContainerManager: Send + Sync {
    /// Refreshes the image, exposes every requested port and leaves the instance started.
    async fn provision(&self, config: &ContainerConfig) -> Result<()>;

    /// Removes every object that belongs to `instance_id` by naming convention.
    async fn deprovision(&self, instance_id: &str) -> Result<()>;

    async fn bind(&self, config: &BindConfig) -> Result<ContainerInfo>;
}

#[async_trait]
pub trait Deployer: Send + Sync {
    /// `port` is the internal port of the node that receives the deployment.
    async fn deploy_contract(
        &self,
        contract: &ContractInfo,
        container: &ContainerInfo,
        port: &str,
    ) -> Result<NodeInfo>;
}
