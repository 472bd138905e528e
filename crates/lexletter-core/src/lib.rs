#![doc = include_str!("../README.md")]

pub mod error;
pub mod id;
pub mod logger;
pub mod models;
pub mod storage;
pub mod validate;

// Re-exports for convenience
pub use error::{Error, ErrorCode, Result};
pub use logger::{AppLogger, LogHandler, LogLevel, LoggerConfig};
pub use models::{
    AuditAction, AuditEntry, Letter, LetterMetadata, LetterStatus, Plan, Role, Subscription,
    SubscriptionStatus, SystemMetrics, User, UserPreferences,
};
pub use storage::{MemoryStorage, StorageBackend, StorageError};
