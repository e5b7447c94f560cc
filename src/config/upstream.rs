use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::{env, fs};
use std::time::Duration;

use crate::config::settings::SettingsConfig;

pub const TOKEN_POINTERS_DEFAULT: [&str; 2] = ["/access_token", "/data/access_token"];
pub const EXPIRES_IN_POINTER_DEFAULT: &str = "/expires_in";
pub const SAFETY_MARGIN_SECONDS_DEFAULT: u64 = 60;
pub const REQUEST_TIMEOUT_MS_DEFAULT: u64 = 30_000;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    pub auth: AuthConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    pub cache: CacheConfig,
}

/// ================================
/// Token endpoint (client credentials)
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub token_url: String,
    pub client_id: SecretValue,
    pub client_secret: SecretValue,
    pub scope: Option<SecretValue>,
    /// JSON pointers tried in order against the token response,
    /// e.g. `/access_token` or `/data/access_token`
    #[serde(default)]
    pub token_pointers: Vec<String>,
    /// lifetime in seconds; enables proactive refresh when present in the response
    pub expires_in_pointer: Option<String>,
    pub safety_margin_seconds: Option<u64>,
}

/// Secret value sources
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum SecretValue {
    Literal {
        value: String,
    },
    FromEnv {
        from_env: String,
    },
    FromFile {
        path: String,
    },
}

impl SecretValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            SecretValue::Literal { value } => Ok(value.to_owned()),
            SecretValue::FromEnv { from_env } => env::var(from_env)
                .map_err(|err| anyhow!("env '{}': {}", from_env, err)),
            SecretValue::FromFile { path } => fs::read_to_string(path)
                .map(|res| res.trim().to_string())
                .map_err(|err| anyhow!("file '{}': {}", path, err)),
        }
    }
}

/// ================================
/// Upstream API
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_ms: Option<u64>,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(REQUEST_TIMEOUT_MS_DEFAULT))
    }
}

/// ================================
/// Outbound network
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { proxy: ProxyConfig::default(), tls_verify: default_tls_verify() }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProxyConfig {
    pub http: Option<String>,
    pub https: Option<String>,
}

fn default_tls_verify() -> bool {
    true
}

/// ================================
/// Metadata cache TTLs
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub schema_ttl_seconds: u64,
    pub service_types_ttl_seconds: u64,
}

impl CacheConfig {
    pub fn schema_ttl(&self) -> Duration {
        Duration::from_secs(self.schema_ttl_seconds)
    }

    pub fn service_types_ttl(&self) -> Duration {
        Duration::from_secs(self.service_types_ttl_seconds)
    }
}
