pub mod common;
pub mod dispatch_retries;
