// Identity store.
//
// Owns user records and the current session. Sessions expire lazily: the 24 h
// timeout is checked on every `current_user` call, never by a background
// timer. Employee referral bookkeeping is mutated only through
// `credit_employee`, keeping ownership with this store.

use std::sync::Arc;

use chrono::Utc;
use lexletter_core::error::{Error, ErrorCode, Result};
use lexletter_core::id::{generate_code, generate_id};
use lexletter_core::models::{AuditAction, Role, User};
use lexletter_core::validate::{
    validate_admin_secret, validate_email, validate_name, validate_password,
};
use serde_json::json;

use crate::audit::AuditLog;
use crate::context::AppContext;
use crate::password::{hash_password, verify_password};

#[derive(Clone)]
pub struct IdentityStore {
    ctx: Arc<AppContext>,
    audit: AuditLog,
}

impl IdentityStore {
    pub(crate) fn new(ctx: Arc<AppContext>, audit: AuditLog) -> Self {
        Self { ctx, audit }
    }

    /// Register a new account and establish it as the current session.
    ///
    /// Admin accounts require the shared admin secret. Employee accounts get a
    /// unique referral coupon code and zeroed commission counters.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
        admin_secret: Option<&str>,
    ) -> Result<User> {
        self.sign_up_inner(email, password, full_name, role, admin_secret)
            .await
            .map_err(|e| e.wrap_unexpected(ErrorCode::InternalError))
    }

    async fn sign_up_inner(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
        admin_secret: Option<&str>,
    ) -> Result<User> {
        validate_email(email)?;
        validate_password(password)?;
        validate_name(full_name)?;
        if role == Role::Admin {
            validate_admin_secret(admin_secret.unwrap_or(""), &self.ctx.options.admin_secret)?;
        }

        self.simulate_latency().await;

        let mut users = self.ctx.load_users().await?;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(Error::Duplicate(ErrorCode::UserAlreadyExists));
        }

        // Hash before creating the record so a failure leaves nothing behind.
        let password_hash = hash_password(password)?;

        let now = Utc::now();
        let mut user = User::new(
            generate_id(),
            email.to_lowercase(),
            full_name.trim().to_string(),
            password_hash,
            role,
        );
        user.last_login_at = Some(now);
        if role == Role::Employee {
            user.coupon_code = Some(unique_coupon_code(&user.full_name, &users));
        }

        users.push(user.clone());
        self.ctx.save_users(&users).await?;
        self.ctx.set_session(&user, now).await?;

        self.audit
            .record(
                AuditAction::UserSignup,
                Some(&user.id),
                json!({ "role": role, "email": user.email }),
            )
            .await;
        self.ctx
            .logger
            .info(&format!("registered {} account {}", role, user.id));

        Ok(user)
    }

    /// Authenticate by email and password and establish the session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        self.sign_in_inner(email, password)
            .await
            .map_err(|e| e.wrap_unexpected(ErrorCode::InternalError))
    }

    async fn sign_in_inner(&self, email: &str, password: &str) -> Result<User> {
        validate_email(email)?;
        if password.trim().is_empty() {
            return Err(Error::validation(ErrorCode::MissingField, "password"));
        }

        self.simulate_latency().await;

        let mut users = self.ctx.load_users().await?;
        let Some(index) = users.iter().position(|u| u.email.eq_ignore_ascii_case(email)) else {
            // Derive a hash anyway so unknown emails take as long as known ones.
            let _ = hash_password(password);
            return Err(Error::Authentication(ErrorCode::InvalidCredentials));
        };

        let user = &users[index];
        if !user.is_active {
            return Err(Error::Authentication(ErrorCode::InvalidCredentials));
        }
        if self.ctx.options.require_email_verification && !user.email_verified {
            return Err(Error::Authentication(ErrorCode::InvalidCredentials));
        }
        if !verify_password(&user.password_hash, password)? {
            return Err(Error::Authentication(ErrorCode::InvalidCredentials));
        }

        let now = Utc::now();
        users[index].last_login_at = Some(now);
        let user = users[index].clone();
        self.ctx.save_users(&users).await?;
        self.ctx.set_session(&user, now).await?;

        self.audit
            .record(
                AuditAction::UserSignin,
                Some(&user.id),
                json!({ "email": user.email }),
            )
            .await;

        Ok(user)
    }

    /// Clear the current session. Idempotent: no session is not an error.
    pub async fn sign_out(&self) -> Result<()> {
        self.sign_out_inner()
            .await
            .map_err(|e| e.wrap_unexpected(ErrorCode::InternalError))
    }

    async fn sign_out_inner(&self) -> Result<()> {
        if let Some(user) = self.ctx.session_user().await? {
            self.audit
                .record(AuditAction::UserSignout, Some(&user.id), serde_json::Value::Null)
                .await;
        }
        self.ctx.clear_session().await
    }

    /// The session user, or `None` once the session has aged past the
    /// timeout. Expiry is evaluated here, on every call, and an expired
    /// session is cleared immediately.
    pub async fn current_user(&self) -> Result<Option<User>> {
        let Some(user) = self.ctx.session_user().await? else {
            return Ok(None);
        };
        let expired = match self.ctx.last_login().await? {
            Some(last_login) => Utc::now() - last_login > self.ctx.options.session_timeout,
            None => true,
        };
        if expired {
            self.audit
                .record(
                    AuditAction::UserSignout,
                    Some(&user.id),
                    json!({ "reason": "session_expired" }),
                )
                .await;
            self.ctx.clear_session().await?;
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Credit a coupon redemption to an employee: one referral plus the
    /// commission amount. The only mutation path for these counters.
    pub async fn credit_employee(&self, employee_id: &str, amount: f64) -> Result<()> {
        let mut users = self.ctx.load_users().await?;
        let Some(user) = users
            .iter_mut()
            .find(|u| u.id == employee_id && u.role == Role::Employee)
        else {
            return Err(Error::NotFound(ErrorCode::UserNotFound));
        };
        user.referrals += 1;
        user.earnings += amount;
        let total = user.earnings;
        self.ctx.save_users(&users).await?;

        self.audit
            .record(
                AuditAction::EmployeeCredited,
                Some(employee_id),
                json!({ "amount": amount, "totalEarnings": total }),
            )
            .await;
        Ok(())
    }

    pub async fn user_by_id(&self, id: &str) -> Result<Option<User>> {
        let users = self.ctx.load_users().await?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    /// Admin read surface.
    pub async fn all_users(&self) -> Result<Vec<User>> {
        self.ctx.load_users().await
    }

    async fn simulate_latency(&self) {
        let latency = self.ctx.options.auth_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Derive a coupon code from the first name (up to four letters, uppercased)
/// plus a random four-character suffix, retrying until unique among the
/// existing users.
fn unique_coupon_code(full_name: &str, existing: &[User]) -> String {
    let prefix: String = full_name
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(4)
        .collect::<String>()
        .to_uppercase();
    loop {
        let code = format!("{prefix}{}", generate_code(4));
        let taken = existing.iter().any(|u| {
            u.coupon_code
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(&code))
        });
        if !taken {
            return code;
        }
    }
}
