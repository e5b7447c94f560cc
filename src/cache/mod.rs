pub mod token;
pub mod token_manager;
pub mod ttl_cache;
