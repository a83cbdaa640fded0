//! Sensor drivers: the per-group flow meters and the boiler level probe.

pub mod flow;
pub mod water_level;
