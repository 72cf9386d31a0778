use crate::domain::model::{BindConfig, Binding, ContainerConfig, ContainerInfo, PortSpec};
use crate::domain::ports::ContainerManager;
use crate::utils::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, Pod, PodSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use std::collections::BTreeMap;

pub const PROVISIONED_BY: &str = "node-broker";

/// Prefix that turns an instance id into its companion Service name.
pub const SERVICE_PREFIX: &str = "svc-";

pub fn service_name(instance_id: &str) -> String {
    format!("{}{}", SERVICE_PREFIX, instance_id)
}

/// The slice of the Kubernetes API the manager needs, scoped to one namespace.
#[async_trait]
pub trait KubeClient: Send + Sync {
    async fn create_pod(&self, pod: &Pod) -> std::result::Result<Pod, kube::Error>;
    async fn create_service(&self, service: &Service) -> std::result::Result<Service, kube::Error>;
    async fn delete_pod(&self, name: &str) -> std::result::Result<(), kube::Error>;
    async fn delete_service(&self, name: &str) -> std::result::Result<(), kube::Error>;
    async fn get_service(&self, name: &str) -> std::result::Result<Service, kube::Error>;
}

#[derive(Clone)]
pub struct NamespacedClient {
    client: Client,
    namespace: String,
}

impl NamespacedClient {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn services(&self) -> Api<Service> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl KubeClient for NamespacedClient {
    async fn create_pod(&self, pod: &Pod) -> std::result::Result<Pod, kube::Error> {
        self.pods().create(&PostParams::default(), pod).await
    }

    async fn create_service(&self, service: &Service) -> std::result::Result<Service, kube::Error> {
        self.services().create(&PostParams::default(), service).await
    }

    async fn delete_pod(&self, name: &str) -> std::result::Result<(), kube::Error> {
        self.pods().delete(name, &DeleteParams::default()).await.map(|_| ())
    }

    async fn delete_service(&self, name: &str) -> std::result::Result<(), kube::Error> {
        self.services()
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }

    async fn get_service(&self, name: &str) -> std::result::Result<Service, kube::Error> {
        self.services().get(name).await
    }
}

/// 每個 instance 對應一個 Pod 與一個 NodePort Service，兩者都以 instance id 命名
pub struct KubernetesContainerManager<K: KubeClient = NamespacedClient> {
    client: K,
    /// Cluster-reachable host handed out as the external address.
    host: String,
}

impl<K: KubeClient> KubernetesContainerManager<K> {
    pub fn new(client: K, host: String) -> Self {
        Self { client, host }
    }
}

fn selector(instance_id: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), instance_id.to_string()),
        ("provisionedBy".to_string(), PROVISIONED_BY.to_string()),
    ])
}

fn pod_for(config: &ContainerConfig, ports: &[PortSpec]) -> Pod {
    let container_ports = ports
        .iter()
        .map(|spec| ContainerPort {
            container_port: i32::from(spec.port),
            protocol: Some(spec.protocol.as_kubernetes_str().to_string()),
            ..Default::default()
        })
        .collect();

    Pod {
        metadata: ObjectMeta {
            name: Some(config.name.clone()),
            labels: Some(selector(&config.name)),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: config.name.clone(),
                image: Some(config.image.clone()),
                ports: Some(container_ports),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn service_for(config: &ContainerConfig, ports: &[PortSpec]) -> Service {
    // target port 不指定，建立時自動對應到同一個 port
    let service_ports = ports
        .iter()
        .map(|spec| ServicePort {
            name: Some(format!("{}-{}", spec.protocol.as_str(), spec.port)),
            port: i32::from(spec.port),
            protocol: Some(spec.protocol.as_kubernetes_str().to_string()),
            ..Default::default()
        })
        .collect();

    Service {
        metadata: ObjectMeta {
            name: Some(service_name(&config.name)),
            labels: Some(selector(&config.name)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("NodePort".to_string()),
            ports: Some(service_ports),
            selector: Some(selector(&config.name)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl<K: KubeClient> ContainerManager for KubernetesContainerManager<K> {
    async fn provision(&self, config: &ContainerConfig) -> Result<()> {
        let ports = PortSpec::parse_all(&config.exposed_ports)?;
        for spec in &ports {
            tracing::debug!(port = %spec.docker_key(), "adding exposed port");
        }

        let pod = pod_for(config, &ports);
        self.client.create_pod(&pod).await.map_err(|e| {
            tracing::error!(name = %config.name, error = %e, "error creating pod");
            e
        })?;
        tracing::info!(name = %config.name, "pod-created");

        let service = service_for(config, &ports);
        tracing::debug!(service = ?service, "creating service");
        self.client.create_service(&service).await.map_err(|e| {
            tracing::error!(name = %service_name(&config.name), error = %e, "error creating service");
            e
        })?;
        tracing::info!(name = %service_name(&config.name), "service-created");

        Ok(())
    }

    async fn deprovision(&self, instance_id: &str) -> Result<()> {
        // 刪除失敗只記錄不回傳，與 Docker backend 的行為不同
        if let Err(e) = self.client.delete_pod(instance_id).await {
            tracing::info!(name = instance_id, error = %e, "pod deletion failed");
        }

        let service = service_name(instance_id);
        if let Err(e) = self.client.delete_service(&service).await {
            tracing::info!(name = %service, error = %e, "service deletion failed");
        }

        Ok(())
    }

    async fn bind(&self, config: &BindConfig) -> Result<ContainerInfo> {
        let service = self
            .client
            .get_service(&service_name(&config.instance_id))
            .await?;

        let ports = service
            .spec
            .and_then(|spec| spec.ports)
            .unwrap_or_default();

        let mut bindings = BTreeMap::new();
        for port in ports {
            let Some(node_port) = port.node_port else {
                tracing::warn!(port = port.port, "service port has no node port assigned");
                continue;
            };
            let internal_port = match port.target_port {
                Some(IntOrString::Int(target)) => target,
                _ => port.port,
            };
            bindings.insert(
                internal_port.to_string(),
                vec![Binding {
                    port: node_port.to_string(),
                    host_ip: String::new(),
                }],
            );
        }

        Ok(ContainerInfo {
            internal_address: config.instance_id.clone(),
            external_address: self.host.clone(),
            bindings,
        })
    }
}
