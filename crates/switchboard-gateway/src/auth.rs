// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication for the gateway.
//!
//! Administrative routes use a bearer token (`Authorization: Bearer <token>`);
//! when none is configured they reject everything (fail-closed). Real-time
//! subscriptions carry an HMAC-signed claims token in the query string.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use switchboard_core::{RealtimeClaims, SwitchboardError, TokenVerifier};

type HmacSha256 = Hmac<Sha256>;

/// Authentication configuration for the administrative routes.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. If `None`, every request is rejected.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Middleware that validates the bearer token.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        tracing::error!("gateway has no bearer token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let provided = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token)
            if token.len() == expected.len()
                && bool::from(token.as_bytes().ct_eq(expected.as_bytes())) =>
        {
            Ok(next.run(request).await)
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Verifies `base64url(claims_json) "." hex(hmac_sha256(base64url(claims_json)))`
/// tokens.
pub struct HmacTokenVerifier {
    key: Vec<u8>,
}

impl HmacTokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, SwitchboardError> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| SwitchboardError::Internal(format!("invalid token key: {e}")))
    }

    /// Issues a token for `claims`.
    pub fn sign(&self, claims: &RealtimeClaims) -> Result<String, SwitchboardError> {
        let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{encoded}.{signature}"))
    }
}

impl TokenVerifier for HmacTokenVerifier {
    fn verify(&self, token: &str, now_unix: i64) -> Option<RealtimeClaims> {
        let (encoded, signature) = token.split_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac().ok()?;
        mac.update(encoded.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let claims: RealtimeClaims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(encoded).ok()?).ok()?;
        if claims.exp <= now_unix {
            tracing::debug!(exp = claims.exp, "realtime token expired");
            return None;
        }
        Some(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp: i64) -> RealtimeClaims {
        RealtimeClaims {
            tenant_id: "t1".into(),
            conversation_id: "c1".into(),
            exp,
        }
    }

    #[test]
    fn auth_config_debug_redacts_token() {
        let config = AuthConfig {
            bearer_token: Some("secret-token".to_string()),
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[redacted]"));
    }

    #[test]
    fn signed_token_verifies() {
        let verifier = HmacTokenVerifier::new("k");
        let token = verifier.sign(&claims(2_000)).unwrap();
        assert_eq!(verifier.verify(&token, 1_000), Some(claims(2_000)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let verifier = HmacTokenVerifier::new("k");
        let token = verifier.sign(&claims(1_000)).unwrap();
        assert_eq!(verifier.verify(&token, 1_000), None);
    }

    #[test]
    fn foreign_key_is_rejected() {
        let token = HmacTokenVerifier::new("a").sign(&claims(2_000)).unwrap();
        assert_eq!(HmacTokenVerifier::new("b").verify(&token, 1_000), None);
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let verifier = HmacTokenVerifier::new("k");
        let token = verifier.sign(&claims(2_000)).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged_claims = RealtimeClaims {
            conversation_id: "c2".into(),
            ..claims(2_000)
        };
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        assert_eq!(verifier.verify(&format!("{forged}.{signature}"), 1_000), None);
    }

    #[test]
    fn garbage_is_rejected() {
        let verifier = HmacTokenVerifier::new("k");
        for token in ["", "abc", "abc.zz", ".", "e30.00"] {
            assert_eq!(verifier.verify(token, 0), None, "{token}");
        }
    }
}
