// Domain layer: rental records, source descriptors and the ports the loader talks through.

pub mod model;
pub mod ports;
