pub mod builder;
pub mod operations;
pub mod routes;
