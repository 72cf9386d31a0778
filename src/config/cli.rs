use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Debug, Clone, Parser)]
#[command(name = "node-broker")]
#[command(about = "Provision blockchain nodes as containers and deploy contracts to them")]
pub struct Cli {
    #[arg(short, long, default_value = "broker.toml")]
    pub config: String,

    /// Directory of service definition JSON files
    #[arg(short, long, default_value = "services")]
    pub services: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List offered services and plans
    Catalog,
    Provision {
        #[arg(long)]
        service_id: String,
        #[arg(long)]
        plan_id: String,
        instance_id: String,
    },
    Deprovision {
        #[arg(long)]
        service_id: String,
        #[arg(long)]
        plan_id: String,
        instance_id: String,
    },
    /// Deploy a contract to a provisioned node
    Bind {
        #[arg(long)]
        service_id: String,
        #[arg(long)]
        plan_id: String,
        instance_id: String,
        binding_id: String,
        #[arg(long)]
        contract_url: Option<String>,
        #[arg(long = "contract-arg")]
        contract_args: Vec<String>,
        /// Raw JSON bind parameters, overrides the two flags above
        #[arg(long, conflicts_with_all = ["contract_url", "contract_args"])]
        parameters: Option<String>,
    },
    Unbind {
        instance_id: String,
        binding_id: String,
    },
    Update {
        instance_id: String,
    },
    LastOperation {
        instance_id: String,
        #[arg(long, default_value = "")]
        operation_data: String,
    },
}

/// 組出 bind 用的原始 JSON 參數
pub fn bind_parameters(
    contract_url: Option<&str>,
    contract_args: &[String],
    parameters: Option<&str>,
) -> Vec<u8> {
    if let Some(raw) = parameters {
        return raw.as_bytes().to_vec();
    }

    let mut value = json!({ "contract_args": contract_args });
    if let Some(url) = contract_url {
        value["contract_url"] = json!(url);
    }
    value.to_string().into_bytes()
}
