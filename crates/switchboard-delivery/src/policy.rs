// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named policy for side effects whose failure must not fail the caller.

use std::future::Future;

use switchboard_core::SwitchboardError;
use tracing::warn;

/// Awaits `future`, logging and dropping its error.
///
/// Returns `None` when the operation failed.
pub async fn best_effort<T, F>(operation: &'static str, future: F) -> Option<T>
where
    F: Future<Output = Result<T, SwitchboardError>>,
{
    match future.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation, error = %e, "best-effort operation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_success_through() {
        let value = best_effort("answer", async { Ok::<_, SwitchboardError>(42) }).await;
        assert_eq!(value, Some(42));
    }

    #[tokio::test]
    async fn swallows_errors() {
        let value: Option<()> = best_effort("broken", async {
            Err(SwitchboardError::Internal("boom".into()))
        })
        .await;
        assert!(value.is_none());
    }
}
