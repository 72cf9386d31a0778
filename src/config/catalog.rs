use crate::domain::catalog::{Catalog, Plan, Service};
use crate::domain::model::PortSpec;
use crate::utils::error::{BrokerError, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One `*.json` file in the service directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceFile {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub plans: Vec<PlanFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanFile {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<String>,
}

/// 讀取 service 目錄下所有 JSON 檔案，組成唯讀的 catalog
pub fn load_catalog<P: AsRef<Path>>(dir: P) -> Result<Catalog> {
    let dir = dir.as_ref();
    if dir.as_os_str().is_empty() {
        return Err(catalog_error("Service Directory Missing"));
    }

    let files = service_files(dir)?;
    if files.is_empty() {
        return Err(catalog_error(format!(
            "service directory is empty: {}",
            dir.display()
        )));
    }

    let mut seen = HashSet::new();
    let mut services = Vec::with_capacity(files.len());
    for path in files {
        let service = load_service_file(&path)?;
        if !seen.insert(service.id.clone()) {
            return Err(catalog_error(format!(
                "duplicate service id {} in {}",
                service.id,
                path.display()
            )));
        }
        tracing::debug!(service = %service.name, plans = service.plans.len(), "loaded service");
        services.push(service);
    }

    tracing::info!(count = services.len(), "service catalog loaded");
    Ok(Catalog::new(services))
}

fn service_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        catalog_error(format!(
            "Error opening service directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn load_service_file(path: &Path) -> Result<Service> {
    let content = std::fs::read_to_string(path)?;
    let file: ServiceFile = serde_json::from_str(&content).map_err(|e| {
        catalog_error(format!(
            "Error parsing service file {}: {}",
            path.display(),
            e
        ))
    })?;
    into_service(file, path)
}

fn into_service(file: ServiceFile, path: &Path) -> Result<Service> {
    if file.name.trim().is_empty() {
        return Err(catalog_error(format!(
            "service in {} has no name",
            path.display()
        )));
    }
    if file.plans.is_empty() {
        return Err(catalog_error(format!(
            "service {} in {} has no plans",
            file.name,
            path.display()
        )));
    }

    let mut plans = HashMap::with_capacity(file.plans.len());
    for plan in file.plans {
        let plan = into_plan(plan, &file.name, path)?;
        if plans.contains_key(&plan.id) {
            return Err(catalog_error(format!(
                "duplicate plan id {} in {}",
                plan.id,
                path.display()
            )));
        }
        plans.insert(plan.id.clone(), plan);
    }

    Ok(Service {
        id: file.id.unwrap_or_else(generate_id),
        name: file.name,
        description: file.description,
        tags: file.tags,
        display_name: file.display_name,
        plans,
    })
}

fn into_plan(plan: PlanFile, service_name: &str, path: &Path) -> Result<Plan> {
    if plan.image.trim().is_empty() {
        return Err(catalog_error(format!(
            "plan {} of service {} in {} has no image",
            plan.name,
            service_name,
            path.display()
        )));
    }
    if plan.ports.is_empty() {
        return Err(catalog_error(format!(
            "plan {} of service {} in {} exposes no ports",
            plan.name,
            service_name,
            path.display()
        )));
    }
    PortSpec::parse_all(&plan.ports).map_err(|e| {
        catalog_error(format!(
            "plan {} of service {} in {}: {}",
            plan.name,
            service_name,
            path.display(),
            e
        ))
    })?;

    Ok(Plan {
        id: plan.id.unwrap_or_else(generate_id),
        name: plan.name,
        description: plan.description,
        image: plan.image,
        ports: plan.ports,
    })
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn catalog_error(message: impl Into<String>) -> BrokerError {
    BrokerError::CatalogError {
        message: message.into(),
    }
}
