//! # Upstream Facade Library
//!
//! Resilient access to an OAuth2-protected third-party REST API:
//! a single shared bearer credential, a retrying dispatcher and a TTL cache
//! for expensive metadata lookups, exposed through a small set of facade
//! operations.
//!
//! Modules:
//! - `config` — service configuration, defaults and validation
//! - `cache` — credential manager and keyed TTL cache
//! - `sources` — token endpoint exchange and the shared HTTP client
//! - `parser` — extracting the credential from token responses
//! - `resilience` — retry policy and the upstream dispatcher
//! - `facade` — business operations and their HTTP routes

pub mod config;
pub mod cache;
pub mod error;
pub mod facade;
pub mod sources;
pub mod resilience;
pub mod parser;
pub mod observability;
pub mod server;
pub mod utils;

#[cfg(test)]
mod tests;


pub use crate::config::upstream::ServiceConfig;
pub use crate::error::{FacadeError, FacadeResult};
