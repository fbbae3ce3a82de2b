//! Atelier: a self-hosted portfolio publishing backend.
//!
//! Public content reads flow through a TTL-bound, request-deduplicating
//! cache with a bundled fallback dataset; admin writes go straight to
//! Postgres and invalidate the cache per entity family.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
