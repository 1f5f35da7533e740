// Domain layer: table/record models and the ports (storage, config, transport, pipeline).

pub mod model;
pub mod ports;
