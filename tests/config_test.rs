use k8s_openapi::api::core::v1::{Pod, Service};
use node_broker::config::{load_catalog, BackendKind, BrokerConfig};
use node_broker::utils::error::ErrorSeverity;
use node_broker::utils::validation::Validate;
use node_broker::{Broker, ToolDeployer};
use std::sync::Arc;
use tempfile::TempDir;

const KUBERNETES_CONFIG: &str = r#"
[backend]
kind = "kubernetes"

[kubernetes]
host = "${NODE_BROKER_IT_HOST}"
namespace = "brokered"

[deployer]
program = "node"
script = "/opt/deployer/pusher.js"
timeout_seconds = 60
"#;

fn write_services(dir: &TempDir) {
    std::fs::write(
        dir.path().join("eth.json"),
        r#"{"id": "eth", "name": "eth", "display_name": "Ethereum",
            "plans": [{"id": "nimak", "name": "nimak", "image": "nimak/geth", "ports": ["8545/tcp", "30303/udp"]}]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("fabric.json"),
        r#"{"id": "fabric", "name": "fabric",
            "plans": [{"id": "peer", "name": "peer", "image": "hyperledger/fabric-peer", "ports": ["7051"]}]}"#,
    )
    .unwrap();
}

#[test]
fn test_kubernetes_config_from_file() {
    std::env::set_var("NODE_BROKER_IT_HOST", "192.168.99.100");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broker.toml");
    std::fs::write(&path, KUBERNETES_CONFIG).unwrap();

    let config = BrokerConfig::from_file(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.backend_kind(), BackendKind::Kubernetes);
    let kubernetes = config.kubernetes.as_ref().unwrap();
    assert_eq!(kubernetes.namespace(), "brokered");
    assert_eq!(kubernetes.host, "192.168.99.100");
    assert_eq!(config.deployer.timeout_seconds(), 60);
    std::env::remove_var("NODE_BROKER_IT_HOST");
}

#[test]
fn test_invalid_config_is_high_severity() {
    let config = BrokerConfig::from_toml_str(
        r#"
[backend]
kind = "docker"

[deployer]
script = "pusher.js"
"#,
    )
    .unwrap();

    let err = config.validate().unwrap_err();
    assert_eq!(err.severity(), ErrorSeverity::High);
}

#[test]
fn test_catalog_directory_feeds_broker() {
    let dir = TempDir::new().unwrap();
    write_services(&dir);

    let catalog = Arc::new(load_catalog(dir.path()).unwrap());
    assert_eq!(catalog.len(), 2);
    assert_eq!(
        catalog.lookup("eth", "nimak").unwrap().primary_port().as_deref(),
        Some("8545")
    );

    let config = BrokerConfig::from_toml_str(KUBERNETES_CONFIG).unwrap();
    let deployer = Arc::new(ToolDeployer::from_config(&config.deployer));
    let manager = Arc::new(node_broker::KubernetesContainerManager::new(
        NoCluster,
        "192.168.99.100".to_string(),
    ));
    let broker = Broker::new(catalog, manager, deployer);

    let names: Vec<String> = broker.services().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["eth", "fabric"]);
}

/// Catalog listing never talks to the cluster.
struct NoCluster;

#[async_trait::async_trait]
impl node_broker::adapters::KubeClient for NoCluster {
    async fn create_pod(&self, _pod: &Pod) -> Result<Pod, kube::Error> {
        unreachable!("catalog listing must not create pods")
    }
    async fn create_service(&self, _service: &Service) -> Result<Service, kube::Error> {
        unreachable!("catalog listing must not create services")
    }
    async fn delete_pod(&self, _name: &str) -> Result<(), kube::Error> {
        unreachable!("catalog listing must not delete pods")
    }
    async fn delete_service(&self, _name: &str) -> Result<(), kube::Error> {
        unreachable!("catalog listing must not delete services")
    }
    async fn get_service(&self, _name: &str) -> Result<Service, kube::Error> {
        unreachable!("catalog listing must not read services")
    }
}
