pub mod startup;
pub mod telemetry;
