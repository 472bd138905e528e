// Append-only activity log.
//
// Shared-write by every store. Bounded: once past `MAX_ENTRIES` the oldest
// entries are evicted. Recording never fails the calling operation — a write
// fault is logged and swallowed.

use std::sync::Arc;

use chrono::Utc;
use lexletter_core::error::Result;
use lexletter_core::id::generate_id;
use lexletter_core::models::{AuditAction, AuditEntry};

use crate::context::AppContext;

/// Maximum retained entries; oldest evicted first.
pub const MAX_ENTRIES: usize = 1000;

#[derive(Clone)]
pub struct AuditLog {
    ctx: Arc<AppContext>,
}

impl AuditLog {
    pub(crate) fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Append an entry. Log-and-continue: a storage fault is reported through
    /// the service logger but never propagated to the caller.
    pub async fn record(&self, action: AuditAction, user_id: Option<&str>, details: serde_json::Value) {
        if let Err(err) = self.try_record(action, user_id, details).await {
            self.ctx
                .logger
                .warn(&format!("audit write failed, entry dropped: {err}"));
        }
    }

    async fn try_record(
        &self,
        action: AuditAction,
        user_id: Option<&str>,
        details: serde_json::Value,
    ) -> Result<()> {
        let mut entries = self.ctx.load_activities().await?;
        entries.push(AuditEntry {
            id: generate_id(),
            action,
            user_id: user_id.map(str::to_string),
            details,
            timestamp: Utc::now(),
        });
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(..excess);
        }
        self.ctx.save_activities(&entries).await
    }

    /// All retained entries, oldest first.
    pub async fn entries(&self) -> Result<Vec<AuditEntry>> {
        self.ctx.load_activities().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use lexletter_core::storage::MemoryStorage;

    fn audit_log() -> AuditLog {
        let ctx = Arc::new(AppContext::new(
            Options::default(),
            Arc::new(MemoryStorage::new()),
        ));
        AuditLog::new(ctx)
    }

    #[tokio::test]
    async fn test_record_appends_in_order() {
        let log = audit_log();
        log.record(AuditAction::UserSignup, Some("u1"), serde_json::Value::Null)
            .await;
        log.record(AuditAction::UserSignin, Some("u1"), serde_json::Value::Null)
            .await;

        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::UserSignup);
        assert_eq!(entries[1].action, AuditAction::UserSignin);
        assert_eq!(entries[0].user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest() {
        let log = audit_log();
        // Pre-seed near the cap so the test stays cheap.
        let mut seeded = Vec::with_capacity(MAX_ENTRIES);
        for i in 0..MAX_ENTRIES {
            seeded.push(AuditEntry {
                id: format!("seed-{i}"),
                action: AuditAction::UserSignin,
                user_id: None,
                details: serde_json::Value::Null,
                timestamp: Utc::now(),
            });
        }
        log.ctx.save_activities(&seeded).await.unwrap();

        log.record(AuditAction::LetterCreated, Some("u1"), serde_json::Value::Null)
            .await;

        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), MAX_ENTRIES);
        // Oldest seed evicted; newest entry present at the tail.
        assert_eq!(entries[0].id, "seed-1");
        assert_eq!(entries.last().unwrap().action, AuditAction::LetterCreated);
    }

    #[tokio::test]
    async fn test_record_survives_corrupt_table() {
        let log = audit_log();
        log.ctx
            .storage
            .set(crate::context::keys::ACTIVITIES, "not json")
            .await
            .unwrap();
        // Must not panic or propagate.
        log.record(AuditAction::UserSignup, None, serde_json::Value::Null)
            .await;
    }
}
