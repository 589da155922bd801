// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations (refinery), applied on every open.

use switchboard_core::SwitchboardError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies pending migrations; history lives in `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), SwitchboardError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| SwitchboardError::Storage {
            source: Box::new(e),
        })?;
    if !report.applied_migrations().is_empty() {
        tracing::info!(
            applied = report.applied_migrations().len(),
            "database migrations applied"
        );
    }
    Ok(())
}
