use anyhow::{anyhow, Result};
use reqwest::Client;
use tracing::debug;

use crate::cache::token::Credential;
use crate::config::upstream::{AuthConfig, SAFETY_MARGIN_SECONDS_DEFAULT};
use crate::parser::parser::parse_token_response;
use crate::sources::FetchToken;

/// Client-credentials grant against the configured token endpoint.
#[derive(Debug, Clone)]
pub struct OAuth2Source {
    pub cfg: AuthConfig,
    pub client: Client,
}

impl OAuth2Source {
    pub fn new(cfg: AuthConfig, client: Client) -> Self {
        Self { cfg, client }
    }

    fn form(&self) -> Result<Vec<(&'static str, String)>> {
        let mut form = vec![
            ("grant_type", "client_credentials".to_owned()),
            ("client_id", self.cfg.client_id.resolve()?),
            ("client_secret", self.cfg.client_secret.resolve()?),
        ];
        if let Some(scope) = &self.cfg.scope {
            form.push(("scope", scope.resolve()?));
        }
        Ok(form)
    }
}

impl FetchToken for OAuth2Source {
    async fn fetch_token(&self) -> Result<Credential> {
        let form = self.form()?;

        debug!(url = %self.cfg.token_url, "requesting client credentials token");
        let response = self.client.post(&self.cfg.token_url).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("OAuth2 token request failed: {}", response.status()));
        }

        let body = response.text().await?;
        parse_token_response(
            &body,
            &self.cfg.token_pointers,
            self.cfg.expires_in_pointer.as_deref(),
            self.cfg.safety_margin_seconds.unwrap_or(SAFETY_MARGIN_SECONDS_DEFAULT),
        )
    }
}
