use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::token::Credential;
use crate::error::{FacadeError, FacadeResult};
use crate::observability::metrics::get_metrics;
use crate::sources::oauth2::OAuth2Source;
use crate::sources::FetchToken;

const SUCCESS_MSG: &str = "success";
const ERROR_MSG: &str = "error";

/// Owns the process-wide bearer credential.
///
/// The lock is held across the token exchange, so concurrent callers that
/// find no usable credential wait for the single in-flight exchange and then
/// observe its result instead of starting their own.
pub struct TokenManager<S = OAuth2Source> {
    source: S,
    credential: Mutex<Option<Credential>>,
}

impl<S: FetchToken + Sync> TokenManager<S> {
    pub fn new(source: S) -> Self {
        Self { source, credential: Mutex::new(None) }
    }

    /// Cached credential, or a fresh one from the token endpoint.
    pub async fn get_token(&self) -> FacadeResult<Credential> {
        let mut guard = self.credential.lock().await;
        if let Some(credential) = guard.as_ref().filter(|c| !c.should_update()) {
            return Ok(credential.clone());
        }

        let metrics = get_metrics().await;
        match self.source.fetch_token().await {
            Ok(credential) => {
                metrics.token_exchanges.with_label_values(&[SUCCESS_MSG]).inc();
                info!(refresh_at = ?credential.refresh_at_unix_ts, "access token obtained");
                *guard = Some(credential.clone());
                Ok(credential)
            }
            Err(e) => {
                metrics.token_exchanges.with_label_values(&[ERROR_MSG]).inc();
                warn!(error = %e, "token exchange failed");
                Err(FacadeError::Authentication(e.to_string()))
            }
        }
    }

    /// Drop the cached credential; the next `get_token` performs an exchange.
    pub async fn invalidate(&self) {
        *self.credential.lock().await = None;
        get_metrics().await.token_invalidations.inc();
        info!("cached access token invalidated");
    }

    /// Drop the cached credential only if it is still the one upstream rejected.
    /// Returns false when another caller already replaced it.
    pub async fn invalidate_rejected(&self, rejected: &Credential) -> bool {
        let mut guard = self.credential.lock().await;
        if guard.as_ref() != Some(rejected) {
            return false;
        }
        *guard = None;
        get_metrics().await.token_invalidations.inc();
        info!("rejected access token invalidated");
        true
    }
}
