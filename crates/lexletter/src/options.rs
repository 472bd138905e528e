// Service configuration.

use std::time::Duration;

use chrono::TimeDelta;
use lexletter_core::logger::LoggerConfig;

/// Default shared secret required to create admin accounts.
pub const DEFAULT_ADMIN_SECRET: &str = "ADMIN_SECRET_2025";

/// Top-level configuration for a [`crate::LexLetter`] instance.
#[derive(Debug, Clone)]
pub struct Options {
    /// Application name, used in generated letters and log output.
    pub app_name: String,

    /// Shared secret gating admin sign-up.
    pub admin_secret: String,

    /// Sessions expire this long after the last sign-in.
    pub session_timeout: TimeDelta,

    /// Simulated generation time between `processing` and `completed`.
    pub processing_delay: Duration,

    /// Artificial latency applied to sign-up/sign-in, simulating a remote
    /// auth provider. Zero disables it.
    pub auth_latency: Duration,

    /// When set, unverified accounts cannot sign in.
    pub require_email_verification: bool,

    pub logger: LoggerConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            app_name: "LexLetter".into(),
            admin_secret: DEFAULT_ADMIN_SECRET.into(),
            session_timeout: TimeDelta::hours(24),
            processing_delay: Duration::from_secs(8),
            auth_latency: Duration::from_millis(500),
            require_email_verification: false,
            logger: LoggerConfig::default(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }
}
