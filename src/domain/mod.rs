// Domain layer: models, the catalog and the ports implemented by adapters.

pub mod catalog;
pub mod model;
pub mod ports;
