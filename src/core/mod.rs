pub mod broker;
pub mod deployer;
pub mod download;

pub use crate::domain::catalog::{Catalog, Plan, Service, ServiceOffering};
pub use crate::domain::model::{
    BindConfig, BindResponse, Binding, ContainerConfig, ContainerInfo, ContractInfo, NodeInfo,
};
pub use crate::domain::ports::{ContainerManager, Deployer};
pub use crate::utils::error::Result;
