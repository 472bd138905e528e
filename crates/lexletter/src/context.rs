// Shared application context.
//
// Built once from `Options` plus an injected storage backend and shared by
// every store via `Arc`. Provides typed load/save helpers over the raw
// key-value backend: one logical table per key, whole tables swapped in a
// single write so readers never observe a partially-mutated record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lexletter_core::error::Result;
use lexletter_core::logger::AppLogger;
use lexletter_core::models::{AuditEntry, Letter, Subscription, User};
use lexletter_core::storage::{StorageBackend, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::options::Options;

/// Storage keys, one logical table per key.
pub mod keys {
    pub const USERS: &str = "users";
    pub const LETTERS: &str = "letters";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const ACTIVITIES: &str = "activities";
    pub const CURRENT_USER: &str = "currentUser";
    pub const LAST_LOGIN: &str = "lastLogin";
}

pub struct AppContext {
    pub storage: Arc<dyn StorageBackend>,
    pub logger: AppLogger,
    pub options: Options,
}

impl AppContext {
    pub fn new(options: Options, storage: Arc<dyn StorageBackend>) -> Self {
        let logger = AppLogger::new(options.logger.clone());
        Self {
            storage,
            logger,
            options,
        }
    }

    async fn load_table<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.storage.get(key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                StorageError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
                .into()
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn save_table<T: Serialize>(&self, key: &str, rows: &[T]) -> Result<()> {
        let raw = serde_json::to_string(rows).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.storage.set(key, &raw).await?;
        Ok(())
    }

    pub async fn load_users(&self) -> Result<Vec<User>> {
        self.load_table(keys::USERS).await
    }

    pub async fn save_users(&self, users: &[User]) -> Result<()> {
        self.save_table(keys::USERS, users).await
    }

    pub async fn load_letters(&self) -> Result<Vec<Letter>> {
        self.load_table(keys::LETTERS).await
    }

    pub async fn save_letters(&self, letters: &[Letter]) -> Result<()> {
        self.save_table(keys::LETTERS, letters).await
    }

    pub async fn load_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.load_table(keys::SUBSCRIPTIONS).await
    }

    pub async fn save_subscriptions(&self, subscriptions: &[Subscription]) -> Result<()> {
        self.save_table(keys::SUBSCRIPTIONS, subscriptions).await
    }

    pub async fn load_activities(&self) -> Result<Vec<AuditEntry>> {
        self.load_table(keys::ACTIVITIES).await
    }

    pub async fn save_activities(&self, entries: &[AuditEntry]) -> Result<()> {
        self.save_table(keys::ACTIVITIES, entries).await
    }

    /// The stored session user, without any expiry check.
    pub async fn session_user(&self) -> Result<Option<User>> {
        match self.storage.get(keys::CURRENT_USER).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| {
                    StorageError::Corrupt {
                        key: keys::CURRENT_USER.to_string(),
                        reason: e.to_string(),
                    }
                    .into()
                }),
            None => Ok(None),
        }
    }

    /// Establish `user` as the current session, refreshing the login instant.
    pub async fn set_session(&self, user: &User, now: DateTime<Utc>) -> Result<()> {
        let raw = serde_json::to_string(user).map_err(|e| StorageError::Corrupt {
            key: keys::CURRENT_USER.to_string(),
            reason: e.to_string(),
        })?;
        self.storage.set(keys::CURRENT_USER, &raw).await?;
        self.storage.set(keys::LAST_LOGIN, &now.to_rfc3339()).await?;
        Ok(())
    }

    pub async fn clear_session(&self) -> Result<()> {
        self.storage.remove(keys::CURRENT_USER).await?;
        self.storage.remove(keys::LAST_LOGIN).await?;
        Ok(())
    }

    /// Instant of the last session refresh; `None` if absent or unreadable.
    pub async fn last_login(&self) -> Result<Option<DateTime<Utc>>> {
        let raw = self.storage.get(keys::LAST_LOGIN).await?;
        Ok(raw
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.to_utc()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexletter_core::models::Role;
    use lexletter_core::storage::MemoryStorage;

    fn ctx() -> AppContext {
        AppContext::new(Options::default(), Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_empty_tables_load_as_empty() {
        let ctx = ctx();
        assert!(ctx.load_users().await.unwrap().is_empty());
        assert!(ctx.load_letters().await.unwrap().is_empty());
        assert!(ctx.load_subscriptions().await.unwrap().is_empty());
        assert!(ctx.load_activities().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_users_round_trip() {
        let ctx = ctx();
        let user = User::new(
            "u1".into(),
            "a@b.co".into(),
            "Alice".into(),
            "hash".into(),
            Role::User,
        );
        ctx.save_users(std::slice::from_ref(&user)).await.unwrap();
        let loaded = ctx.load_users().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "u1");
        assert_eq!(loaded[0].created_at, user.created_at);
    }

    #[tokio::test]
    async fn test_session_round_trip_and_clear() {
        let ctx = ctx();
        let user = User::new(
            "u1".into(),
            "a@b.co".into(),
            "Alice".into(),
            "hash".into(),
            Role::User,
        );
        let now = Utc::now();
        ctx.set_session(&user, now).await.unwrap();

        assert_eq!(ctx.session_user().await.unwrap().unwrap().id, "u1");
        let stored = ctx.last_login().await.unwrap().unwrap();
        assert_eq!(stored, now);

        ctx.clear_session().await.unwrap();
        assert!(ctx.session_user().await.unwrap().is_none());
        assert!(ctx.last_login().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_table_is_an_error() {
        let ctx = ctx();
        ctx.storage.set(keys::USERS, "not json").await.unwrap();
        assert!(ctx.load_users().await.is_err());
    }
}
