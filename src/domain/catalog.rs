use crate::domain::model::PortSpec;
use crate::utils::error::{BrokerError, Result};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image: String,
    pub ports: Vec<String>,
}

impl Plan {
    /// 第一個 exposed port 是部署合約的目標，回傳不含協定的 port 號碼
    pub fn primary_port(&self) -> Option<String> {
        self.ports
            .first()
            .and_then(|spec| spec.parse::<PortSpec>().ok())
            .map(|spec| spec.port.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub display_name: String,
    pub plans: HashMap<String, Plan>,
}

impl Service {
    pub fn plan(&self, plan_id: &str) -> Result<&Plan> {
        self.plans
            .get(plan_id)
            .ok_or_else(|| BrokerError::PlanNotFound {
                plan_id: plan_id.to_string(),
            })
    }
}

/// Read-only after startup; shared between concurrent calls behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    services: HashMap<String, Service>,
}

impl Catalog {
    pub fn new(services: impl IntoIterator<Item = Service>) -> Self {
        Self {
            services: services
                .into_iter()
                .map(|service| (service.id.clone(), service))
                .collect(),
        }
    }

    pub fn service(&self, service_id: &str) -> Result<&Service> {
        self.services
            .get(service_id)
            .ok_or_else(|| BrokerError::ServiceNotFound {
                service_id: service_id.to_string(),
            })
    }

    /// Service 與 plan 都存在時才回傳 plan
    pub fn lookup(&self, service_id: &str, plan_id: &str) -> Result<&Plan> {
        self.service(service_id)?.plan(plan_id)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// 依名稱排序的 service 清單
    pub fn offerings(&self) -> Vec<ServiceOffering> {
        let mut offerings: Vec<ServiceOffering> =
            self.services.values().map(ServiceOffering::from).collect();
        offerings.sort_by(|a, b| a.name.cmp(&b.name));
        offerings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceMetadata {
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanOffering {
    pub id: String,
    pub name: String,
    pub description: String,
    pub free: bool,
}

/// What the catalog operation hands to the broker protocol layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceOffering {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    pub tags: Vec<String>,
    pub metadata: ServiceMetadata,
    pub plans: Vec<PlanOffering>,
}

impl From<&Service> for ServiceOffering {
    fn from(service: &Service) -> Self {
        let mut plans: Vec<PlanOffering> = service
            .plans
            .values()
            .map(|plan| PlanOffering {
                id: plan.id.clone(),
                name: plan.name.clone(),
                description: plan.description.clone(),
                free: true,
            })
            .collect();
        plans.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            id: service.id.clone(),
            name: service.name.clone(),
            description: service.description.clone(),
            bindable: true,
            tags: service.tags.clone(),
            metadata: ServiceMetadata {
                display_name: service.display_name.clone(),
            },
            plans,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth_service() -> Service {
        let plan = Plan {
            id: "free-plan".to_string(),
            name: "free".to_string(),
            description: "Free Trial".to_string(),
            image: "nimak/geth".to_string(),
            ports: vec!["8545".to_string(), "30303/udp".to_string()],
        };
        Service {
            id: "eth".to_string(),
            name: "eth".to_string(),
            description: "Ethereum Geth Node".to_string(),
            tags: vec!["ethereum".to_string()],
            display_name: "Geth 1.8".to_string(),
            plans: HashMap::from([(plan.id.clone(), plan)]),
        }
    }

    #[test]
    fn test_lookup_reports_missing_service_before_plan() {
        let catalog = Catalog::new([eth_service()]);

        assert!(catalog.lookup("eth", "free-plan").is_ok());
        assert!(matches!(
            catalog.lookup("btc", "free-plan"),
            Err(BrokerError::ServiceNotFound { .. })
        ));
        assert!(matches!(
            catalog.lookup("eth", "gold"),
            Err(BrokerError::PlanNotFound { .. })
        ));
    }

    #[test]
    fn test_primary_port_strips_protocol() {
        let mut plan = eth_service().plans.remove("free-plan").unwrap();
        assert_eq!(plan.primary_port().as_deref(), Some("8545"));

        plan.ports = vec!["5000/udp".to_string()];
        assert_eq!(plan.primary_port().as_deref(), Some("5000"));

        plan.ports.clear();
        assert_eq!(plan.primary_port(), None);
    }

    #[test]
    fn test_offering_marks_plans_free_and_bindable() {
        let offering = ServiceOffering::from(&eth_service());
        assert!(offering.bindable);
        assert_eq!(offering.metadata.display_name, "Geth 1.8");
        assert_eq!(offering.plans.len(), 1);
        assert!(offering.plans[0].free);
    }

    #[test]
    fn test_offerings_sorted_by_name() {
        let mut btc = eth_service();
        btc.id = "btc".to_string();
        btc.name = "bitcoin".to_string();
        let catalog = Catalog::new([eth_service(), btc]);

        let names: Vec<String> = catalog.offerings().into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["bitcoin", "eth"]);
    }
}
