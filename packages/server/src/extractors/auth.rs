use axum::{extract::FromRequestParts, http::request::Parts};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::AppState;

/// Service-to-service authentication via the `X-API-Key` header.
///
/// Add this as a handler parameter to require a valid key. This is not
/// end-user auth; callers are other backend services.
#[derive(Debug)]
pub struct ApiKey;

impl FromRequestParts<AppState> for ApiKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get("X-API-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if provided.is_empty() {
            return Err(AppError::Unauthorized("missing X-API-Key header".into()));
        }

        if !is_valid_key(provided, &state.config.auth.api_keys) {
            return Err(AppError::Unauthorized("invalid API key".into()));
        }

        Ok(ApiKey)
    }
}

/// Check the provided key against the configured set in constant time.
/// Every candidate is compared so the runtime doesn't depend on which key
/// (if any) matched.
pub fn is_valid_key(key: &str, valid_keys: &[String]) -> bool {
    let mut matched = false;
    for valid in valid_keys {
        matched |= bool::from(key.as_bytes().ct_eq(valid.as_bytes()));
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_valid_key_matches() {
        let valid = keys(&["alpha", "beta"]);
        assert!(is_valid_key("alpha", &valid));
        assert!(is_valid_key("beta", &valid));
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let valid = keys(&["alpha"]);
        assert!(!is_valid_key("alph", &valid));
        assert!(!is_valid_key("alphaa", &valid));
        assert!(!is_valid_key("", &valid));
    }

    #[test]
    fn test_empty_key_set_rejects_everything() {
        assert!(!is_valid_key("anything", &[]));
    }
}
