pub mod config;
pub mod error;
pub mod probation;
pub mod telemetry;
