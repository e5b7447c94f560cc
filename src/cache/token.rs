use std::fmt;

use chrono::Utc;

/// Bearer credential issued by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub value: String,
    /// UNIX timestamp after which the credential is refreshed proactively.
    /// `None` when the token response carries no expiry metadata.
    pub refresh_at_unix_ts: Option<i64>,
}

impl Credential {
    pub fn new(value: String, refresh_at_unix_ts: Option<i64>) -> Self {
        Self { value, refresh_at_unix_ts }
    }

    /// Check if credential should be refreshed before use
    pub fn should_update(&self) -> bool {
        self.refresh_at_unix_ts
            .map(|refresh_at| Utc::now().timestamp() >= refresh_at)
            .unwrap_or(false)
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

// never print the token itself
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"***")
            .field("refresh_at_unix_ts", &self.refresh_at_unix_ts)
            .finish()
    }
}
