// Domain layer: host-facing models and the ports the adapter is built against.

pub mod model;
pub mod ports;
