use crate::config::toml_config::DeployerConfig;
use crate::domain::model::{ContainerInfo, ContractInfo, NodeInfo};
use crate::domain::ports::Deployer;
use crate::utils::error::{BrokerError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub const DEFAULT_DEPLOY_TIMEOUT: Duration = Duration::from_secs(300);

/// Request file handed to the deploy tool with `-c`.
#[derive(Debug, Serialize)]
struct DeployRequest<'a> {
    provider: String,
    password: &'a str,
    args: &'a [String],
}

/// 透過外部工具部署合約
///
/// The tool is run as `<program> <script> -c <request> -o <output> <contract>`.
/// Exit code 0 means the output file holds the node info as JSON; anything
/// else is a failure whose diagnostics are on stdout/stderr. Both temp files
/// live only for the duration of one call.
#[derive(Debug, Clone)]
pub struct ToolDeployer {
    program: String,
    script: PathBuf,
    timeout: Duration,
}

impl ToolDeployer {
    pub fn new(program: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            timeout: DEFAULT_DEPLOY_TIMEOUT,
        }
    }

    pub fn from_config(config: &DeployerConfig) -> Self {
        Self::new(config.program(), config.script.clone())
            .with_timeout(Duration::from_secs(config.timeout_seconds()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_tool(&self, request_path: &str, output_path: &str, contract: &ContractInfo) -> Result<String> {
        let mut command = Command::new(&self.program);
        command
            .arg(&self.script)
            .arg("-c")
            .arg(request_path)
            .arg("-o")
            .arg(output_path)
            .arg(&contract.contract_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::error!(program = %self.program, error = %e, "Failed to start deploy tool");
                return Err(BrokerError::DeployToolExecutionFailed {
                    status: "not started".to_string(),
                    output: e.to_string(),
                });
            }
            Err(_) => {
                tracing::error!(seconds = self.timeout.as_secs(), "Deploy tool timed out");
                return Err(BrokerError::DeployToolTimedOut {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            tracing::error!(status = %output.status, output = %combined, "Deploy tool run failed");
            return Err(BrokerError::DeployToolExecutionFailed {
                status: output.status.to_string(),
                output: combined,
            });
        }

        Ok(combined)
    }
}

#[async_trait]
impl Deployer for ToolDeployer {
    async fn deploy_contract(
        &self,
        contract: &ContractInfo,
        container: &ContainerInfo,
        port: &str,
    ) -> Result<NodeInfo> {
        tracing::info!(port, "deploy-started");

        let binding = container
            .bindings
            .get(port)
            .and_then(|bindings| bindings.first())
            .ok_or_else(|| BrokerError::PortBindingMissing {
                port: port.to_string(),
            })?;

        let request = DeployRequest {
            provider: format!("http://{}:{}", container.internal_address, binding.port),
            password: "",
            args: &contract.contract_args,
        };

        let request_file = tempfile::Builder::new()
            .prefix("deploy-request-")
            .suffix(".json")
            .tempfile()?;
        tokio::fs::write(request_file.path(), serde_json::to_vec(&request)?).await?;

        let output_file = tempfile::Builder::new()
            .prefix("deploy-output-")
            .suffix(".json")
            .tempfile()?;

        let request_path = request_file.path().to_string_lossy().into_owned();
        let output_path = output_file.path().to_string_lossy().into_owned();
        let tool_output = self.run_tool(&request_path, &output_path, contract).await?;

        let content = tokio::fs::read(&output_path).await.map_err(|source| {
            tracing::error!(output = %tool_output, error = %source, "reading-output-failed");
            BrokerError::DeployOutputUnreadable {
                path: output_path.clone(),
                source,
            }
        })?;

        let node_info: NodeInfo = serde_json::from_slice(&content).map_err(|source| {
            let content = String::from_utf8_lossy(&content).into_owned();
            tracing::error!(output = %tool_output, content = %content, "parsing-content-failed");
            BrokerError::DeployOutputUnparseable { source, content }
        })?;

        tracing::debug!(output = %tool_output, "deploy-data");
        tracing::info!(contract_address = %node_info.contract_address, "deploy-succeeded");
        Ok(node_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Binding;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn write_stub(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("stub-deployer.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn contract_info() -> ContractInfo {
        ContractInfo {
            contract_url: "http://example.com/poll.sol".to_string(),
            contract_args: vec!["sample-arg-1".to_string(), "sample-arg-2".to_string()],
            contract_path: PathBuf::from("path-to-contract"),
        }
    }

    fn container_info() -> ContainerInfo {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "8545".to_string(),
            vec![Binding {
                port: "1234".to_string(),
                host_ip: String::new(),
            }],
        );
        ContainerInfo {
            internal_address: "127.0.0.1".to_string(),
            external_address: "12.34.56.78".to_string(),
            bindings,
        }
    }

    const VALIDATING_STUB: &str = r#"
[ "$1" = "-c" ] || { echo "Expected flag -c to be provided"; exit 1; }
grep -qF '"provider":"http://127.0.0.1:1234"' "$2" || { echo "Incorrect provider"; cat "$2"; exit 1; }
grep -qF '"password":""' "$2" || { echo "Password should be empty"; exit 1; }
grep -qF '"args":["sample-arg-1","sample-arg-2"]' "$2" || { echo "Args were not passed in untouched"; exit 1; }
[ "$3" = "-o" ] || { echo "Expected flag -o to be provided"; exit 1; }
[ "$5" = "path-to-contract" ] || { echo "Incorrect contract path: $5"; exit 1; }
cat > "$4" <<'JSON'
{
    "address": "sample-account",
    "abi": "sample-abi",
    "contract_address": "sample-address",
    "gas_price": "0",
    "transaction_hash": "sample-tx-hash"
}
JSON
"#;

    #[tokio::test]
    async fn test_runs_tool_with_request_and_contract_path() {
        let dir = TempDir::new().unwrap();
        let deployer = ToolDeployer::new("sh", write_stub(&dir, VALIDATING_STUB));

        let node_info = deployer
            .deploy_contract(&contract_info(), &container_info(), "8545")
            .await
            .unwrap();

        assert_eq!(
            node_info,
            NodeInfo {
                account: "sample-account".to_string(),
                interface: "sample-abi".to_string(),
                contract_address: "sample-address".to_string(),
                gas_price: "0".to_string(),
                transaction_hash: "sample-tx-hash".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_port_binding() {
        let dir = TempDir::new().unwrap();
        let deployer = ToolDeployer::new("sh", write_stub(&dir, VALIDATING_STUB));

        let result = deployer
            .deploy_contract(&contract_info(), &container_info(), "5000")
            .await;

        assert!(matches!(result, Err(BrokerError::PortBindingMissing { port }) if port == "5000"));
    }

    #[tokio::test]
    async fn test_empty_binding_list_counts_as_missing() {
        let dir = TempDir::new().unwrap();
        let deployer = ToolDeployer::new("sh", write_stub(&dir, VALIDATING_STUB));
        let mut container = container_info();
        container.bindings.insert("8545".to_string(), vec![]);

        let result = deployer
            .deploy_contract(&contract_info(), &container, "8545")
            .await;

        assert!(matches!(result, Err(BrokerError::PortBindingMissing { .. })));
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_combined_output() {
        let dir = TempDir::new().unwrap();
        let stub = write_stub(&dir, "echo 'to stdout'\necho 'to stderr' >&2\nexit 3\n");
        let deployer = ToolDeployer::new("sh", stub);

        let result = deployer
            .deploy_contract(&contract_info(), &container_info(), "8545")
            .await;

        match result {
            Err(BrokerError::DeployToolExecutionFailed { output, .. }) => {
                assert!(output.contains("to stdout"));
                assert!(output.contains("to stderr"));
            }
            other => panic!("expected DeployToolExecutionFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_output_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let deployer = ToolDeployer::new("sh", write_stub(&dir, "rm -f \"$4\"\n"));

        let result = deployer
            .deploy_contract(&contract_info(), &container_info(), "8545")
            .await;

        assert!(matches!(
            result,
            Err(BrokerError::DeployOutputUnreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_garbage_output_is_unparseable() {
        let dir = TempDir::new().unwrap();
        let deployer = ToolDeployer::new("sh", write_stub(&dir, "echo 'not json' > \"$4\"\n"));

        let result = deployer
            .deploy_contract(&contract_info(), &container_info(), "8545")
            .await;

        match result {
            Err(BrokerError::DeployOutputUnparseable { content, .. }) => {
                assert_eq!(content.trim(), "not json")
            }
            other => panic!("expected DeployOutputUnparseable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_tool_times_out() {
        let dir = TempDir::new().unwrap();
        let deployer = ToolDeployer::new("sh", write_stub(&dir, "sleep 10\n"))
            .with_timeout(Duration::from_millis(200));

        let result = deployer
            .deploy_contract(&contract_info(), &container_info(), "8545")
            .await;

        assert!(matches!(result, Err(BrokerError::DeployToolTimedOut { .. })));
    }

    #[tokio::test]
    async fn test_temp_files_are_removed_on_success_and_failure() {
        let dir = TempDir::new().unwrap();
        let record = dir.path().join("paths");

        for tail in ["echo '{}' > \"$4\"", "exit 1"] {
            let stub = format!("printf '%s\\n%s\\n' \"$2\" \"$4\" > '{}'\n{}\n", record.display(), tail);
            let deployer = ToolDeployer::new("sh", write_stub(&dir, &stub));

            let _ = deployer
                .deploy_contract(&contract_info(), &container_info(), "8545")
                .await;

            let recorded = std::fs::read_to_string(&record).unwrap();
            let paths: Vec<&str> = recorded.lines().collect();
            assert_eq!(paths.len(), 2);
            for path in paths {
                assert!(!std::path::Path::new(path).exists(), "{} was left behind", path);
            }
        }
    }
}
