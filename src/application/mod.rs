//! Application services: repository contracts, admin command services, and
//! the cached public content service.

pub mod admin;
pub mod content;
pub mod error;
pub mod repos;
