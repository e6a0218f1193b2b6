//! CLI command implementations.

mod audit;
mod config;
mod doctor;
mod ingest;
mod sources;

pub use audit::run_audit;
pub use config::run_config;
pub use doctor::run_doctor;
pub use ingest::run_ingest;
pub use sources::run_sources;
