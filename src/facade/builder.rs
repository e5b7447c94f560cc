use std::sync::Arc;

use anyhow::Result;

use crate::cache::token_manager::TokenManager;
use crate::config::settings::RetryConfig;
use crate::config::upstream::ServiceConfig;
use crate::facade::operations::Facade;
use crate::resilience::dispatcher::Dispatcher;
use crate::resilience::retry::RetrySettings;
use crate::sources::client::build_client;
use crate::sources::oauth2::OAuth2Source;

/// Token manager and dispatcher sharing one outbound client.
pub fn build_dispatcher(config: &ServiceConfig) -> Result<Arc<Dispatcher>> {
    let client = build_client(&config.network, &config.upstream)?;

    let source = OAuth2Source::new(config.auth.clone(), client.clone());
    let tokens = Arc::new(TokenManager::new(source));

    let retry_config = config.settings.retry.clone().unwrap_or_default();
    let retry = RetrySettings::from(&retry_config);

    Ok(Arc::new(Dispatcher::new(client, &config.upstream, tokens, retry)))
}

pub fn build_facade(config: &ServiceConfig) -> Result<Arc<Facade>> {
    let dispatcher = build_dispatcher(config)?;
    Ok(Arc::new(Facade::new(dispatcher, config.cache.clone())))
}
