//! LexLetter service layer: identity, letters, subscriptions, audit, and
//! metrics over an injected key-value storage backend.
//!
//! Everything hangs off one [`LexLetter`] instance, constructed explicitly at
//! application start — there is no global state, so tests isolate themselves
//! with a fresh in-memory backend:
//!
//! ```
//! use lexletter::{LexLetter, Options};
//! use lexletter_core::models::Role;
//!
//! # async fn demo() -> lexletter_core::error::Result<()> {
//! let app = LexLetter::in_memory(Options::default());
//! let user = app
//!     .identity
//!     .sign_up("jane@example.com", "Str0ngPass", "Jane Smith", Role::User, None)
//!     .await?;
//! assert_eq!(app.identity.current_user().await?.unwrap().id, user.id);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod context;
pub mod identity;
pub mod letters;
pub mod metrics;
pub mod options;
pub mod password;
pub mod subscriptions;

use std::sync::Arc;

use lexletter_core::storage::{MemoryStorage, StorageBackend};

pub use audit::AuditLog;
pub use context::AppContext;
pub use identity::IdentityStore;
pub use letters::{LetterRequest, LetterStore};
pub use metrics::{DataExport, HealthReport, HealthStatus, MetricsReporter};
pub use options::Options;
pub use subscriptions::SubscriptionStore;

/// The assembled service: every store sharing one context.
pub struct LexLetter {
    pub identity: IdentityStore,
    pub letters: LetterStore,
    pub subscriptions: SubscriptionStore,
    pub audit: AuditLog,
    pub metrics: MetricsReporter,
    ctx: Arc<AppContext>,
}

impl LexLetter {
    /// Build the service over an injected storage backend.
    pub fn new(options: Options, storage: Arc<dyn StorageBackend>) -> Self {
        let ctx = Arc::new(AppContext::new(options, storage));
        let audit = AuditLog::new(ctx.clone());
        let identity = IdentityStore::new(ctx.clone(), audit.clone());
        let subscriptions = SubscriptionStore::new(ctx.clone(), audit.clone(), identity.clone());
        let letters = LetterStore::new(
            ctx.clone(),
            audit.clone(),
            identity.clone(),
            subscriptions.clone(),
        );
        let metrics = MetricsReporter::new(ctx.clone());
        Self {
            identity,
            letters,
            subscriptions,
            audit,
            metrics,
            ctx,
        }
    }

    /// Build the service over a fresh in-memory backend.
    pub fn in_memory(options: Options) -> Self {
        Self::new(options, Arc::new(MemoryStorage::new()))
    }

    /// The shared application context.
    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }
}
