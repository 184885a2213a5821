pub mod config;
pub mod error;
pub mod intake;
pub mod portfolio;
pub mod telemetry;
