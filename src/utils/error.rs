use thiserror::Error;

/// 容器平台回傳的錯誤，訊息原樣傳遞給呼叫端
#[derive(Error, Debug)]
pub enum BackendError {
    #[error(transparent)]
    Docker(#[from] bollard::errors::Error),

    #[error(transparent)]
    Kubernetes(#[from] kube::Error),

    #[error("invalid port spec '{spec}': {reason}")]
    InvalidPortSpec { spec: String, reason: String },
}

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("service not found: {service_id}")]
    ServiceNotFound { service_id: String },

    #[error("plan not found: {plan_id}")]
    PlanNotFound { plan_id: String },

    #[error("contract_url not found")]
    ContractUrlMissing,

    #[error("invalid bind parameters: {0}")]
    InvalidBindParameters(serde_json::Error),

    #[error("Port Bindings do not have {port} port mapping")]
    PortBindingMissing { port: String },

    #[error("failed to download contract from {url}: {reason}")]
    ContractDownloadFailed { url: String, reason: String },

    #[error("deploy tool exited with {status}: {output}")]
    DeployToolExecutionFailed { status: String, output: String },

    #[error("deploy tool did not finish within {seconds}s")]
    DeployToolTimedOut { seconds: u64 },

    #[error("deploy output {path} is unreadable: {source}")]
    DeployOutputUnreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("deploy output is not valid node info: {source} (content: {content})")]
    DeployOutputUnparseable {
        source: serde_json::Error,
        content: String,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Catalog error: {message}")]
    CatalogError { message: String },
}

pub type Result<T> = std::result::Result<T, BrokerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 呼叫端給的 service / plan / 參數有誤
    Input,
    Backend,
    Deploy,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl From<bollard::errors::Error> for BrokerError {
    fn from(err: bollard::errors::Error) -> Self {
        BrokerError::Backend(BackendError::Docker(err))
    }
}

impl From<kube::Error> for BrokerError {
    fn from(err: kube::Error) -> Self {
        BrokerError::Backend(BackendError::Kubernetes(err))
    }
}

impl BrokerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BrokerError::ServiceNotFound { .. }
            | BrokerError::PlanNotFound { .. }
            | BrokerError::ContractUrlMissing
            | BrokerError::InvalidBindParameters(_) => ErrorCategory::Input,
            BrokerError::Backend(_) | BrokerError::PortBindingMissing { .. } => {
                ErrorCategory::Backend
            }
            BrokerError::ContractDownloadFailed { .. }
            | BrokerError::DeployToolExecutionFailed { .. }
            | BrokerError::DeployToolTimedOut { .. }
            | BrokerError::DeployOutputUnreadable { .. }
            | BrokerError::DeployOutputUnparseable { .. } => ErrorCategory::Deploy,
            BrokerError::ConfigError { .. }
            | BrokerError::ConfigValidationError { .. }
            | BrokerError::InvalidConfigValueError { .. }
            | BrokerError::MissingConfigError { .. }
            | BrokerError::CatalogError { .. } => ErrorCategory::Configuration,
            BrokerError::IoError(_) | BrokerError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Backend | ErrorCategory::Deploy => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BrokerError::ServiceNotFound { .. } | BrokerError::PlanNotFound { .. } => {
                "Check the service and plan ids against the catalog"
            }
            BrokerError::ContractUrlMissing | BrokerError::InvalidBindParameters(_) => {
                "Pass bind parameters as {\"contract_url\": \"...\", \"contract_args\": [...]}"
            }
            BrokerError::PortBindingMissing { .. } => {
                "Make sure the instance was provisioned with the plan's ports and is still running"
            }
            BrokerError::ContractDownloadFailed { .. } => {
                "Verify the contract URL is reachable from the broker"
            }
            BrokerError::DeployToolExecutionFailed { .. } | BrokerError::DeployToolTimedOut { .. } => {
                "Inspect the deploy tool output and the node's availability"
            }
            BrokerError::DeployOutputUnreadable { .. }
            | BrokerError::DeployOutputUnparseable { .. } => {
                "The deploy tool finished but did not write valid node info; check its version"
            }
            BrokerError::Backend(_) => {
                "Check the container platform; a failed call may need a deprovision to clean up"
            }
            BrokerError::ConfigError { .. }
            | BrokerError::ConfigValidationError { .. }
            | BrokerError::InvalidConfigValueError { .. }
            | BrokerError::MissingConfigError { .. } => "Fix the broker configuration file",
            BrokerError::CatalogError { .. } => "Fix the service definition files",
            BrokerError::IoError(_) | BrokerError::SerializationError(_) => {
                "Check disk space and permissions of the temp directory"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Request rejected: {}", self),
            ErrorCategory::Backend => format!("Container platform error: {}", self),
            ErrorCategory::Deploy => format!("Contract deployment failed: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}
