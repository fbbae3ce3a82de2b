//! Infrastructure adapters: Postgres persistence, HTTP transport, upload
//! storage, and telemetry.

pub mod db;
pub mod error;
pub mod http;
pub mod telemetry;
pub mod uploads;

pub use error::InfraError;
