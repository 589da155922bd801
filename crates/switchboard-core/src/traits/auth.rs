// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time subscription token verification.

use crate::types::RealtimeClaims;

/// Verifies short-lived subscription tokens issued by an external collaborator.
///
/// Verification is synchronous and side-effect free; an invalid, tampered, or
/// expired token yields `None`.
pub trait TokenVerifier: Send + Sync {
    /// Returns the claims carried by `token` if it is valid at `now_unix`.
    fn verify(&self, token: &str, now_unix: i64) -> Option<RealtimeClaims>;
}
