// Subscription store.
//
// Owns subscription records: plan pricing, coupon resolution, and employee
// commission crediting (routed through the identity store, which owns the
// counters). Expiry is derived from `expiresAt` at read time, never swept.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use lexletter_core::error::{Error, ErrorCode, Result};
use lexletter_core::id::generate_id;
use lexletter_core::models::{AuditAction, Plan, Role, Subscription, SubscriptionStatus, User};
use serde_json::json;

use crate::audit::AuditLog;
use crate::context::AppContext;
use crate::identity::IdentityStore;

/// Coupon discount applied at checkout, in percent.
pub const COUPON_DISCOUNT_PERCENT: f64 = 20.0;

/// Employee commission on the discounted price.
pub const COMMISSION_RATE: f64 = 0.05;

#[derive(Clone)]
pub struct SubscriptionStore {
    ctx: Arc<AppContext>,
    audit: AuditLog,
    identity: IdentityStore,
}

impl SubscriptionStore {
    pub(crate) fn new(ctx: Arc<AppContext>, audit: AuditLog, identity: IdentityStore) -> Self {
        Self {
            ctx,
            audit,
            identity,
        }
    }

    /// Resolve a coupon code to its issuing employee.
    ///
    /// An unknown code is an expected outcome, not an error: callers treat
    /// `None` as "no discount". Matching is case-insensitive and restricted
    /// to active employees.
    pub async fn resolve_coupon(&self, code: &str) -> Result<Option<User>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }
        let users = self.ctx.load_users().await?;
        Ok(users.into_iter().find(|u| {
            u.role == Role::Employee
                && u.is_active
                && u.coupon_code
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(code))
        }))
    }

    /// Create a subscription for `user_id` on `plan`, applying a coupon
    /// discount and crediting the issuing employee when the code resolves.
    pub async fn create_subscription(
        &self,
        user_id: &str,
        plan: Plan,
        coupon_code: Option<&str>,
    ) -> Result<Subscription> {
        self.create_subscription_inner(user_id, plan, coupon_code)
            .await
            .map_err(|e| e.wrap_unexpected(ErrorCode::SubscriptionFailed))
    }

    async fn create_subscription_inner(
        &self,
        user_id: &str,
        plan: Plan,
        coupon_code: Option<&str>,
    ) -> Result<Subscription> {
        let users = self.ctx.load_users().await?;
        if !users.iter().any(|u| u.id == user_id) {
            return Err(Error::NotFound(ErrorCode::UserNotFound));
        }

        let employee = match coupon_code {
            Some(code) => self.resolve_coupon(code).await?,
            None => None,
        };

        let list_price = plan.list_price();
        let (price, discount) = match &employee {
            Some(_) => (
                list_price * (1.0 - COUPON_DISCOUNT_PERCENT / 100.0),
                COUPON_DISCOUNT_PERCENT,
            ),
            None => (list_price, 0.0),
        };
        let original_price = price / (1.0 - discount / 100.0);

        let now = Utc::now();
        let subscription = Subscription {
            id: generate_id(),
            user_id: user_id.to_string(),
            plan,
            price,
            original_price,
            discount,
            coupon_code: employee.as_ref().and_then(|e| e.coupon_code.clone()),
            employee_id: employee.as_ref().map(|e| e.id.clone()),
            status: SubscriptionStatus::Active,
            created_at: now,
            expires_at: plan.is_annual().then(|| now + TimeDelta::days(365)),
            letters_used: 0,
            letters_allowed: plan.letters_allowed(),
        };

        let mut subscriptions = self.ctx.load_subscriptions().await?;
        subscriptions.push(subscription.clone());
        self.ctx.save_subscriptions(&subscriptions).await?;

        if let Some(employee) = &employee {
            self.identity
                .credit_employee(&employee.id, price * COMMISSION_RATE)
                .await?;
        }

        self.audit
            .record(
                AuditAction::SubscriptionCreated,
                Some(user_id),
                json!({
                    "subscriptionId": subscription.id,
                    "plan": plan,
                    "price": subscription.price,
                }),
            )
            .await;

        Ok(subscription)
    }

    /// The subscription governing quota for `user_id`: the most recently
    /// created one that is active and unexpired.
    pub async fn active_subscription(&self, user_id: &str) -> Result<Option<Subscription>> {
        let now = Utc::now();
        let subscriptions = self.ctx.load_subscriptions().await?;
        Ok(subscriptions
            .into_iter()
            .filter(|s| s.user_id == user_id && s.is_current(now))
            .max_by_key(|s| s.created_at))
    }

    /// Consume one letter credit. Called by the letter store at creation
    /// time; re-checks the quota invariant under the stored record.
    pub(crate) async fn consume_letter_credit(&self, subscription_id: &str) -> Result<()> {
        let mut subscriptions = self.ctx.load_subscriptions().await?;
        let Some(subscription) = subscriptions.iter_mut().find(|s| s.id == subscription_id) else {
            return Err(Error::Business(ErrorCode::NoSubscription));
        };
        if !subscription.has_quota() {
            return Err(Error::Business(ErrorCode::QuotaExceeded));
        }
        subscription.letters_used += 1;
        self.ctx.save_subscriptions(&subscriptions).await
    }

    pub async fn subscriptions_for_user(&self, user_id: &str) -> Result<Vec<Subscription>> {
        let subscriptions = self.ctx.load_subscriptions().await?;
        Ok(subscriptions
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect())
    }

    /// Admin read surface.
    pub async fn all_subscriptions(&self) -> Result<Vec<Subscription>> {
        self.ctx.load_subscriptions().await
    }
}
