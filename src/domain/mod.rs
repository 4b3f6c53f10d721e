// Domain layer: models and ports. No I/O here.

pub mod historical;
pub mod model;
pub mod outcome;
pub mod ports;
pub mod profile;
pub mod state;
