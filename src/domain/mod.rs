// Domain layer: pipeline records and ports (interfaces).
// Nutrition rules live in `crate::nutrition`.

pub mod model;
pub mod ports;
