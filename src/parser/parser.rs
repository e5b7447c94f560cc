use crate::cache::token::Credential;

use anyhow::{anyhow, Result};
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: i64,
}

/// Extract the bearer credential from a token endpoint response body.
///
/// `token_pointers` are tried in order; the first one resolving to a
/// non-empty string wins. Expiry is taken from `expires_in_pointer`
/// (seconds) when present, otherwise from the JWT `exp` claim when the
/// token is a JWT, otherwise left unknown.
pub fn parse_token_response(
    body: &str,
    token_pointers: &[String],
    expires_in_pointer: Option<&str>,
    safety_margin_seconds: u64,
) -> Result<Credential> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| anyhow!("token response is not valid JSON: {}", e))?;

    let token_value = token_pointers
        .iter()
        .find_map(|pointer| {
            json.pointer(pointer)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
        })
        .ok_or_else(|| anyhow!("token response lacks credential field, tried {:?}", token_pointers))?
        .to_owned();

    let now = Utc::now().timestamp();
    let margin = i64::try_from(safety_margin_seconds).unwrap_or(i64::MAX);

    let refresh_at = match expires_in_pointer
        .and_then(|pointer| json.pointer(pointer))
        .and_then(lifetime_seconds)
    {
        Some(lifetime) => refresh_time(now, lifetime, margin),
        None => get_jwt_token_expiration(&token_value)
            .and_then(|exp| refresh_time(now, exp.saturating_sub(now), margin)),
    };
    debug!(refresh_at = ?refresh_at, "token response parsed");

    Ok(Credential::new(token_value, refresh_at))
}

// some providers send expires_in as a string
fn lifetime_seconds(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse::<i64>().ok()))
        .filter(|lifetime| *lifetime > 0)
}

/// `now + lifetime - margin`, the margin capped at half the lifetime so a
/// short-lived token is still reused. `None` when the sum does not fit.
fn refresh_time(now: i64, lifetime: i64, margin: i64) -> Option<i64> {
    let margin = margin.min(lifetime.max(0) / 2);
    now.checked_add(lifetime)?.checked_sub(margin)
}

fn get_jwt_token_expiration(token_value: &str) -> Option<i64> {
    let parts: Vec<&str> = token_value.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .inspect_err(|e| warn!("jwt payload base64 decode error: {}", e))
        .ok()?;

    serde_json::from_slice::<JwtClaims>(&decoded)
        .map(|claims| claims.exp)
        .ok()
        .filter(|exp| *exp > 0)
}
