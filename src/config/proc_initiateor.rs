use crate::config::settings::{LogFormat, LoggingConfig, RetryConfig};
use crate::config::upstream::{
    ServiceConfig, EXPIRES_IN_POINTER_DEFAULT, SAFETY_MARGIN_SECONDS_DEFAULT, TOKEN_POINTERS_DEFAULT,
};
use crate::utils::constants::{
    RETRY_AFTER_MAX_SECONDS_DEFAULT, RETRY_ATTEMPTS_DEFAULT, RETRY_BASE_DELAY_MS_DEFAULT,
    RETRY_MAX_DELAY_MS_DEFAULT,
};

pub fn initiate_default_values(mut config: ServiceConfig) -> ServiceConfig {
    // logging
    if config.settings.logging.is_none() {
        config.settings.logging = Some(LoggingConfig::new("info".to_owned(), LogFormat::Compact));
    }

    // retry
    let retry = config.settings.retry.get_or_insert_with(RetryConfig::default);
    retry.attempts.get_or_insert(RETRY_ATTEMPTS_DEFAULT);
    retry.base_delay_ms.get_or_insert(RETRY_BASE_DELAY_MS_DEFAULT);
    retry.max_delay_ms.get_or_insert(RETRY_MAX_DELAY_MS_DEFAULT);
    retry.max_retry_after_seconds.get_or_insert(RETRY_AFTER_MAX_SECONDS_DEFAULT);

    // token extraction
    let auth = &mut config.auth;
    if auth.token_pointers.is_empty() {
        auth.token_pointers = TOKEN_POINTERS_DEFAULT.iter().map(|p| p.to_string()).collect();
    }
    auth.expires_in_pointer.get_or_insert_with(|| EXPIRES_IN_POINTER_DEFAULT.to_owned());
    auth.safety_margin_seconds.get_or_insert(SAFETY_MARGIN_SECONDS_DEFAULT);

    // upstream base url is joined with absolute request paths
    while config.upstream.base_url.ends_with('/') {
        config.upstream.base_url.pop();
    }

    config
}
