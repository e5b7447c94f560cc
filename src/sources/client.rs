use anyhow::{Context, Result};
use reqwest::{Client, Proxy};
use tracing::{info, warn};

use crate::config::upstream::{NetworkConfig, UpstreamConfig};

/// Build the process-wide HTTP client shared by the token exchange and the
/// upstream dispatcher: proxy routing, TLS verification and request timeout.
pub fn build_client(network: &NetworkConfig, upstream: &UpstreamConfig) -> Result<Client> {
    let mut builder = Client::builder().timeout(upstream.timeout());

    if let Some(http_proxy) = &network.proxy.http {
        builder = builder.proxy(Proxy::http(http_proxy).context("invalid http proxy")?);
        info!(proxy = %http_proxy, "routing http traffic through proxy");
    }
    if let Some(https_proxy) = &network.proxy.https {
        builder = builder.proxy(Proxy::https(https_proxy).context("invalid https proxy")?);
        info!(proxy = %https_proxy, "routing https traffic through proxy");
    }

    if !network.tls_verify {
        warn!("TLS certificate verification is disabled; do not use in production");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().context("failed to build HTTP client")
}
