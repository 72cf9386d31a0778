use crate::utils::error::BackendError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Provision 的輸入，每次呼叫重新建立
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// 等於 instance id
    pub name: String,
    pub image: String,
    pub exposed_ports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindConfig {
    pub instance_id: String,
    pub binding_id: String,
}

/// One externally reachable mapping for one internal port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub port: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host_ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub internal_address: String,
    pub external_address: String,
    /// Keyed by the internal container port ("8545"), never by the assigned external port.
    pub bindings: BTreeMap<String, Vec<Binding>>,
}

/// Caller supplied bind parameters, decoded at the broker boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BindParameters {
    #[serde(default)]
    pub contract_url: Option<String>,
    #[serde(default)]
    pub contract_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInfo {
    pub contract_url: String,
    pub contract_args: Vec<String>,
    /// Local copy of the contract source; only valid for the duration of one bind call.
    pub contract_path: PathBuf,
}

/// Deploy tool 的輸出檔格式
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(rename = "address", default)]
    pub account: String,
    #[serde(rename = "abi", default)]
    pub interface: String,
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub gas_price: String,
    #[serde(default)]
    pub transaction_hash: String,
}

/// Credentials handed back from a successful bind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindResponse {
    pub container_info: ContainerInfo,
    pub node_info: NodeInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortProtocol {
    Tcp,
    Udp,
    Sctp,
}

impl PortProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortProtocol::Tcp => "tcp",
            PortProtocol::Udp => "udp",
            PortProtocol::Sctp => "sctp",
        }
    }

    /// Kubernetes 使用大寫的協定名稱
    pub fn as_kubernetes_str(&self) -> &'static str {
        match self {
            PortProtocol::Tcp => "TCP",
            PortProtocol::Udp => "UDP",
            PortProtocol::Sctp => "SCTP",
        }
    }
}

/// A parsed `"port[/proto]"` entry from a plan. Bare ports default to TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortSpec {
    pub port: u16,
    pub protocol: PortProtocol,
}

impl PortSpec {
    pub fn parse_all(specs: &[String]) -> Result<Vec<PortSpec>, BackendError> {
        specs.iter().map(|spec| spec.parse()).collect()
    }

    /// Docker 的 port key 格式，例如 `8545/tcp`
    pub fn docker_key(&self) -> String {
        format!("{}/{}", self.port, self.protocol.as_str())
    }
}

impl FromStr for PortSpec {
    type Err = BackendError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| BackendError::InvalidPortSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let (port, protocol) = match spec.trim().split_once('/') {
            Some((port, proto)) => (port, proto),
            None => (spec.trim(), "tcp"),
        };

        let port: u16 = port
            .parse()
            .map_err(|_| invalid("port must be a number between 1 and 65535"))?;
        if port == 0 {
            return Err(invalid("port must be a number between 1 and 65535"));
        }

        let protocol = match protocol.to_ascii_lowercase().as_str() {
            "tcp" => PortProtocol::Tcp,
            "udp" => PortProtocol::Udp,
            "sctp" => PortProtocol::Sctp,
            _ => return Err(invalid("protocol must be tcp, udp or sctp")),
        };

        Ok(PortSpec { port, protocol })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.port)
    }
}
