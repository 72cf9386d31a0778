use crate::core::download::download_contract;
use crate::domain::catalog::{Catalog, ServiceOffering};
use crate::domain::model::{
    BindConfig, BindParameters, BindResponse, ContainerConfig, ContractInfo,
};
use crate::domain::ports::{ContainerManager, Deployer};
use crate::utils::error::{BrokerError, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for fetching a contract source during bind.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Instance lifecycle orchestrator.
///
/// Resolves service and plan from the catalog, then hands the work to the
/// configured [`ContainerManager`]. Bind additionally downloads the contract
/// and runs the [`Deployer`] against the node. Lookup failures return before
/// any backend call; every other error is passed through unchanged.
pub struct Broker {
    catalog: Arc<Catalog>,
    manager: Arc<dyn ContainerManager>,
    deployer: Arc<dyn Deployer>,
    client: Client,
    download_timeout: Duration,
}

impl Broker {
    pub fn new(
        catalog: Arc<Catalog>,
        manager: Arc<dyn ContainerManager>,
        deployer: Arc<dyn Deployer>,
    ) -> Self {
        Self {
            catalog,
            manager,
            deployer,
            client: Client::new(),
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn services(&self) -> Vec<ServiceOffering> {
        tracing::debug!(count = self.catalog.len(), "listing services");
        self.catalog.offerings()
    }

    pub async fn provision(&self, service_id: &str, plan_id: &str, instance_id: &str) -> Result<()> {
        tracing::info!(instance_id, "provision started");

        let plan = self.catalog.lookup(service_id, plan_id)?;
        let config = ContainerConfig {
            name: instance_id.to_string(),
            image: plan.image.clone(),
            exposed_ports: plan.ports.clone(),
        };

        let result = self.manager.provision(&config).await;
        tracing::info!(instance_id, ok = result.is_ok(), "provision finished");
        result
    }

    pub async fn deprovision(&self, service_id: &str, plan_id: &str, instance_id: &str) -> Result<()> {
        tracing::info!(instance_id, "deprovision started");

        self.catalog.lookup(service_id, plan_id)?;

        let result = self.manager.deprovision(instance_id).await;
        tracing::info!(instance_id, ok = result.is_ok(), "deprovision finished");
        result
    }

    pub async fn bind(
        &self,
        service_id: &str,
        plan_id: &str,
        instance_id: &str,
        binding_id: &str,
        raw_parameters: &[u8],
    ) -> Result<BindResponse> {
        tracing::info!(instance_id, binding_id, "bind started");

        let plan = self.catalog.lookup(service_id, plan_id)?;

        let parameters = parse_bind_parameters(raw_parameters)?;
        let contract_url = match parameters.contract_url {
            Some(url) if !url.is_empty() => url,
            _ => return Err(BrokerError::ContractUrlMissing),
        };

        // 暫存檔在離開此函式時刪除
        let contract_file = download_contract(&self.client, &contract_url, self.download_timeout).await?;
        let contract = ContractInfo {
            contract_url,
            contract_args: parameters.contract_args,
            contract_path: contract_file.path().to_path_buf(),
        };

        let bind_config = BindConfig {
            instance_id: instance_id.to_string(),
            binding_id: binding_id.to_string(),
        };
        let container_info = self.manager.bind(&bind_config).await?;

        let port = plan.primary_port().ok_or_else(|| BrokerError::PortBindingMissing {
            port: "<none declared by plan>".to_string(),
        })?;
        let node_info = self
            .deployer
            .deploy_contract(&contract, &container_info, &port)
            .await?;

        tracing::info!(instance_id, binding_id, "bind finished");
        Ok(BindResponse {
            container_info,
            node_info,
        })
    }

    pub async fn unbind(&self, instance_id: &str, binding_id: &str) -> Result<()> {
        tracing::debug!(instance_id, binding_id, "unbind is a no-op");
        Ok(())
    }

    pub async fn update(&self, instance_id: &str) -> Result<()> {
        tracing::debug!(instance_id, "update is a no-op");
        Ok(())
    }

    pub async fn last_operation(&self, instance_id: &str, _operation_data: &str) -> Result<()> {
        tracing::debug!(instance_id, "last_operation is a no-op");
        Ok(())
    }
}

/// 空的 payload 視為沒有參數
fn parse_bind_parameters(raw: &[u8]) -> Result<BindParameters> {
    if raw.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(BindParameters::default());
    }
    // JSON null 等同沒有參數
    serde_json::from_slice::<Option<BindParameters>>(raw)
        .map(Option::unwrap_or_default)
        .map_err(BrokerError::InvalidBindParameters)
}
