//! API token gate middleware.
//!
//! Requires an `Authorization: Bearer <token>` header whose SHA-256 digest
//! matches one of the configured token hashes. Runs before the grid engine,
//! which never inspects credentials itself.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Middleware that rejects requests without a valid API token.
///
/// An empty hash list disables the gate.
pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let accepted = state.api_token_hashes();
    if accepted.is_empty() {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        debug!("missing bearer token");
        return AppError::Unauthorized.into_response();
    };

    if !token_matches(token, accepted) {
        debug!("bearer token rejected");
        return AppError::Unauthorized.into_response();
    }

    next.run(request).await
}

/// SHA-256 hash a token as lowercase hex.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare the token's digest against every accepted digest in constant time.
fn token_matches(token: &str, accepted: &[String]) -> bool {
    let digest = hash_token(token);
    accepted
        .iter()
        .fold(false, |found, hash| {
            found | bool::from(digest.as_bytes().ct_eq(hash.as_bytes()))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hashing() {
        let token = "estate_test_token";
        let hash1 = hash_token(token);
        let hash2 = hash_token(token);
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);

        let hash3 = hash_token("different_token");
        assert_ne!(hash1, hash3);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_token_matches_any_accepted() {
        let accepted = vec![hash_token("first"), hash_token("second")];

        assert!(token_matches("second", &accepted));
        assert!(!token_matches("third", &accepted));
        assert!(!token_matches("second", &[]));
    }
}
