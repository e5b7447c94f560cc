//! Sources module
//!
//! Where credentials come from: the token endpoint and the HTTP client it is reached through.

use anyhow::Result;

use crate::cache::token::Credential;

pub mod client;
pub mod oauth2;

pub trait FetchToken {
    fn fetch_token(&self) -> impl std::future::Future<Output = Result<Credential>> + Send;
}
