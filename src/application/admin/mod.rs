//! Admin command services: validation, slug management, audit, and cache
//! invalidation around the write repositories.

pub mod audit;
pub mod categories;
pub mod pages;
pub mod projects;
pub mod uploads;
