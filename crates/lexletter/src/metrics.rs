// Read-side aggregation for dashboards and admin views.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lexletter_core::error::Result;
use lexletter_core::models::{AuditEntry, Letter, Role, Subscription, SystemMetrics, User};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Snapshot returned by [`MetricsReporter::health_check`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub metrics: SystemMetrics,
}

/// Full data export for admin tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub users: Vec<User>,
    pub letters: Vec<Letter>,
    pub subscriptions: Vec<Subscription>,
    pub activities: Vec<AuditEntry>,
}

#[derive(Clone)]
pub struct MetricsReporter {
    ctx: Arc<AppContext>,
}

impl MetricsReporter {
    pub(crate) fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Aggregate counts across all stores. Tolerates an empty data set: every
    /// metric is zero, and the conversion rate never divides by zero.
    pub async fn system_metrics(&self) -> Result<SystemMetrics> {
        let users = self.ctx.load_users().await?;
        let letters = self.ctx.load_letters().await?;
        let subscriptions = self.ctx.load_subscriptions().await?;

        let now = Utc::now();
        let conversion_rate = if users.is_empty() {
            0.0
        } else {
            subscriptions.len() as f64 / users.len() as f64 * 100.0
        };

        Ok(SystemMetrics {
            total_users: users.iter().filter(|u| u.role == Role::User).count() as u64,
            total_employees: users.iter().filter(|u| u.role == Role::Employee).count() as u64,
            total_letters: letters.len() as u64,
            total_revenue: subscriptions.iter().map(|s| s.price).sum(),
            active_subscriptions: subscriptions.iter().filter(|s| s.is_current(now)).count() as u64,
            conversion_rate,
        })
    }

    /// Degrades instead of failing: any read fault yields `Degraded` with
    /// zeroed metrics.
    pub async fn health_check(&self) -> HealthReport {
        match self.system_metrics().await {
            Ok(metrics) => HealthReport {
                status: HealthStatus::Healthy,
                timestamp: Utc::now(),
                metrics,
            },
            Err(err) => {
                self.ctx.logger.error(&format!("health check degraded: {err}"));
                HealthReport {
                    status: HealthStatus::Degraded,
                    timestamp: Utc::now(),
                    metrics: SystemMetrics::default(),
                }
            }
        }
    }

    /// Everything, for admin export.
    pub async fn export_data(&self) -> Result<DataExport> {
        Ok(DataExport {
            users: self.ctx.load_users().await?,
            letters: self.ctx.load_letters().await?,
            subscriptions: self.ctx.load_subscriptions().await?,
            activities: self.ctx.load_activities().await?,
        })
    }
}
