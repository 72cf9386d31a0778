use node_broker::core::{Binding, ContainerInfo, ContractInfo, Deployer};
use node_broker::{BrokerError, ToolDeployer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

// 把 request 檔的 provider/password 改名成 address/abi 後當成輸出
const ECHO_STUB: &str = r#"sed -e 's/"provider"/"address"/' -e 's/"password"/"abi"/' "$2" > "$4"
"#;

fn container(port: &str) -> ContainerInfo {
    let mut bindings = BTreeMap::new();
    bindings.insert(
        "8545".to_string(),
        vec![Binding {
            port: port.to_string(),
            host_ip: String::new(),
        }],
    );
    ContainerInfo {
        internal_address: "10.1.2.3".to_string(),
        external_address: "203.0.113.7".to_string(),
        bindings,
    }
}

fn contract() -> ContractInfo {
    ContractInfo {
        contract_url: "http://example.com/poll.sol".to_string(),
        contract_args: vec!["7".to_string()],
        contract_path: PathBuf::from("poll.sol"),
    }
}

fn deployer(dir: &TempDir, body: &str) -> ToolDeployer {
    let script = dir.path().join("deploy.sh");
    std::fs::write(&script, body).unwrap();
    ToolDeployer::new("sh", script)
}

#[tokio::test]
async fn test_request_file_reaches_the_tool() {
    let dir = TempDir::new().unwrap();
    let node_info = deployer(&dir, ECHO_STUB)
        .deploy_contract(&contract(), &container("31000"), "8545")
        .await
        .unwrap();

    assert_eq!(node_info.account, "http://10.1.2.3:31000");
    assert_eq!(node_info.interface, "");
    assert_eq!(node_info.contract_address, "");
}

#[tokio::test]
async fn test_concurrent_deploys_use_separate_files() {
    let dir = TempDir::new().unwrap();
    let deployer = deployer(&dir, ECHO_STUB);

    let first_container = container("31001");
    let second_container = container("31002");
    let first_contract = contract();
    let second_contract = contract();
    let (first, second) = tokio::join!(
        deployer.deploy_contract(&first_contract, &first_container, "8545"),
        deployer.deploy_contract(&second_contract, &second_container, "8545"),
    );

    assert_eq!(first.unwrap().account, "http://10.1.2.3:31001");
    assert_eq!(second.unwrap().account, "http://10.1.2.3:31002");
}

#[tokio::test]
async fn test_hung_tool_times_out() {
    let dir = TempDir::new().unwrap();
    let deployer = deployer(&dir, "sleep 5\n").with_timeout(Duration::from_millis(200));

    let result = deployer
        .deploy_contract(&contract(), &container("31000"), "8545")
        .await;

    assert!(matches!(result, Err(BrokerError::DeployToolTimedOut { .. })));
}
