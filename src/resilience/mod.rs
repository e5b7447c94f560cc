pub mod retry;
pub mod dispatcher;
