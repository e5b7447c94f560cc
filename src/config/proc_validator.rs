//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates:
//!   * token endpoint, upstream and proxy URLs
//!   * secret value sources
//!   * token extraction pointers
//!   * retry / logging / metrics invariants
//!   * cache TTLs

use tracing::{error, info};

use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::config::upstream::{
    AuthConfig, CacheConfig, NetworkConfig, SecretValue, ServiceConfig, UpstreamConfig,
};
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_auth(&cfg.auth, &mut errors);
    validate_upstream(&cfg.upstream, &mut errors);
    validate_network(&cfg.network, &mut errors);
    validate_cache(&cfg.cache, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(retry) = &settings.retry {
        validate_retry("settings.retry", retry, errors);
    }

    if settings.server.host.is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' must be an integer in range 0-65535",
            settings.server.port
        ));
    }

    // metrics endpoint start with '/'
    let metrics = &settings.metrics;
    if !metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            metrics.path
        ));
    }

    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if let Some(attempts) = retry.attempts {
        if attempts == 0 {
            errors.push(format!("{}.attempts must be > 0", path));
        }
    }
    if retry.max_retry_after_seconds == Some(0) {
        errors.push(format!("{}.max_retry_after_seconds must be > 0", path));
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
                path, max, base
            ));
        }
    }
}

/// AUTH VALIDATION
fn validate_auth(auth: &AuthConfig, errors: &mut Vec<String>) {
    validate_url("auth.token_url", &auth.token_url, errors);
    validate_secret_value("auth.client_id", &auth.client_id, errors);
    validate_secret_value("auth.client_secret", &auth.client_secret, errors);
    if let Some(scope) = &auth.scope {
        validate_secret_value("auth.scope", scope, errors);
    }

    if auth.token_pointers.is_empty() {
        errors.push("auth.token_pointers must contain at least one JSON pointer".to_string());
    }
    for (idx, pointer) in auth.token_pointers.iter().enumerate() {
        validate_pointer(&format!("auth.token_pointers[{}]", idx), pointer, errors);
    }
    if let Some(pointer) = &auth.expires_in_pointer {
        validate_pointer("auth.expires_in_pointer", pointer, errors);
    }
}

fn validate_secret_value(path: &str, v: &SecretValue, errors: &mut Vec<String>) {
    match v {
        SecretValue::Literal { value } => {
            if value.is_empty() {
                errors.push(format!("{}: literal value must not be empty", path));
            }
        }
        SecretValue::FromEnv { from_env } => {
            if from_env.is_empty() {
                errors.push(format!("{}: from_env must not be empty", path));
            }
        }
        SecretValue::FromFile { path: file } => {
            if file.is_empty() {
                errors.push(format!("{}: path must not be empty", path));
            }
        }
    }
}

fn validate_pointer(path: &str, pointer: &str, errors: &mut Vec<String>) {
    if !pointer.starts_with('/') {
        errors.push(format!(
            "{} '{}' must be a JSON pointer starting with '/'",
            path, pointer
        ));
    }
}

/// UPSTREAM / NETWORK VALIDATION
fn validate_upstream(upstream: &UpstreamConfig, errors: &mut Vec<String>) {
    validate_url("upstream.base_url", &upstream.base_url, errors);
    if upstream.timeout_ms == Some(0) {
        errors.push("upstream.timeout_ms must be > 0".to_string());
    }
}

fn validate_network(network: &NetworkConfig, errors: &mut Vec<String>) {
    if let Some(proxy) = &network.proxy.http {
        validate_url("network.proxy.http", proxy, errors);
    }
    if let Some(proxy) = &network.proxy.https {
        validate_url("network.proxy.https", proxy, errors);
    }
}

fn validate_url(path: &str, url: &str, errors: &mut Vec<String>) {
    if url.is_empty() {
        errors.push(format!("{} must not be empty", path));
        return;
    }
    if reqwest::Url::parse(url).is_err() {
        errors.push(format!("{} '{}' is not a valid URL", path, url));
        return;
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("{} '{}' must use http or https", path, url));
    }
}

/// CACHE VALIDATION
fn validate_cache(cache: &CacheConfig, errors: &mut Vec<String>) {
    if cache.schema_ttl_seconds == 0 {
        errors.push("cache.schema_ttl_seconds must be > 0".to_string());
    }
    if cache.service_types_ttl_seconds == 0 {
        errors.push("cache.service_types_ttl_seconds must be > 0".to_string());
    }
}
