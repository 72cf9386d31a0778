use clap::Parser;
use node_broker::config::cli::{bind_parameters, Cli, Command};
use node_broker::utils::error::ErrorSeverity;
use node_broker::utils::logger::{self, LogFormat};
use node_broker::utils::validation::Validate;
use node_broker::{
    container_manager_from_config, load_catalog, Broker, BrokerConfig, BrokerError, ToolDeployer,
};
use serde::Serialize;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(format, cli.verbose);

    tracing::info!("Starting node-broker");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ node-broker failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 4,      // 請求錯誤
            ErrorSeverity::Medium => 2,   // 可重試
            ErrorSeverity::High => 1,     // 設定錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> Result<(), BrokerError> {
    let config = BrokerConfig::from_file(&cli.config)?;
    config.validate()?;

    let catalog = Arc::new(load_catalog(&cli.services)?);

    // catalog 不需要連線到 container backend
    if let Command::Catalog = cli.command {
        return print_json(&catalog.offerings());
    }

    let manager = container_manager_from_config(&config).await?;
    let deployer = Arc::new(ToolDeployer::from_config(&config.deployer));
    let broker = Broker::new(catalog, manager, deployer);

    match cli.command {
        Command::Catalog => print_json(&broker.services()),
        Command::Provision {
            service_id,
            plan_id,
            instance_id,
        } => {
            broker.provision(&service_id, &plan_id, &instance_id).await?;
            println!("✅ Provisioned {}", instance_id);
            Ok(())
        }
        Command::Deprovision {
            service_id,
            plan_id,
            instance_id,
        } => {
            broker.deprovision(&service_id, &plan_id, &instance_id).await?;
            println!("✅ Deprovisioned {}", instance_id);
            Ok(())
        }
        Command::Bind {
            service_id,
            plan_id,
            instance_id,
            binding_id,
            contract_url,
            contract_args,
            parameters,
        } => {
            let raw = bind_parameters(contract_url.as_deref(), &contract_args, parameters.as_deref());
            let response = broker
                .bind(&service_id, &plan_id, &instance_id, &binding_id, &raw)
                .await?;
            print_json(&response)
        }
        Command::Unbind {
            instance_id,
            binding_id,
        } => broker.unbind(&instance_id, &binding_id).await,
        Command::Update { instance_id } => broker.update(&instance_id).await,
        Command::LastOperation {
            instance_id,
            operation_data,
        } => broker.last_operation(&instance_id, &operation_data).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BrokerError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
