// Persisted data models.
//
// Every record serializes as camelCase JSON with RFC 3339 timestamps so the
// stored tables round-trip exactly through the key-value backend.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCode};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Employee,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-user display and notification preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: Theme,
    pub notifications: NotificationPreferences,
    pub privacy: PrivacyPreferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email: bool,
    pub push: bool,
    pub marketing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyPreferences {
    pub profile_visible: bool,
    pub analytics_opt_out: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            notifications: NotificationPreferences {
                email: true,
                push: false,
                marketing: false,
            },
            privacy: PrivacyPreferences {
                profile_visible: true,
                analytics_opt_out: false,
            },
        }
    }
}

/// Identity record.
///
/// Employee accounts additionally carry a referral coupon code and the
/// commission bookkeeping fields (`referrals`, `earnings`), which only the
/// identity store may mutate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Stored lowercased; unique case-insensitively.
    pub email: String,
    pub full_name: String,
    /// scrypt hash in `salt:key` hex form.
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    /// Present iff `role == Employee`; unique across employees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub referrals: u32,
    pub earnings: f64,
    pub preferences: UserPreferences,
}

impl User {
    pub fn new(id: String, email: String, full_name: String, password_hash: String, role: Role) -> Self {
        Self {
            id,
            email: email.to_lowercase(),
            full_name,
            password_hash,
            role,
            is_active: true,
            email_verified: true,
            created_at: Utc::now(),
            last_login_at: None,
            coupon_code: None,
            referrals: 0,
            earnings: 0.0,
            preferences: UserPreferences::default(),
        }
    }
}

/// Generation lifecycle of a letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Generation metadata recorded on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterMetadata {
    pub model: String,
    /// Simulated processing time in seconds.
    pub processing_time: f64,
    pub word_count: u32,
    pub confidence_score: f64,
    pub review_required: bool,
}

impl Default for LetterMetadata {
    fn default() -> Self {
        Self {
            model: "gemini-pro".into(),
            processing_time: 0.0,
            word_count: 0,
            confidence_score: 0.0,
            review_required: false,
        }
    }
}

/// A legal-letter generation request and its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Letter {
    pub id: String,
    pub user_id: String,
    pub sender_name: String,
    pub sender_address: String,
    pub recipient_name: String,
    pub recipient_address: String,
    pub matter: String,
    pub resolution: String,
    /// Empty until generation completes.
    pub content: String,
    pub status: LetterStatus,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Incremented on every status transition.
    pub version: u32,
    pub metadata: LetterMetadata,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub download_count: u32,
}

/// Purchasable plan. Prices and letter allowances are fixed per plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Single,
    Annual4,
    Annual8,
}

impl Plan {
    /// Undiscounted list price in dollars.
    pub fn list_price(&self) -> f64 {
        match self {
            Plan::Single => 299.0,
            Plan::Annual4 => 299.0,
            Plan::Annual8 => 599.0,
        }
    }

    pub fn letters_allowed(&self) -> u32 {
        match self {
            Plan::Single => 1,
            Plan::Annual4 => 4,
            Plan::Annual8 => 8,
        }
    }

    /// Annual plans expire 365 days after purchase; `single` never does.
    pub fn is_annual(&self) -> bool {
        !matches!(self, Plan::Single)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Single => "single",
            Plan::Annual4 => "annual4",
            Plan::Annual8 => "annual8",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Plan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Plan::Single),
            "annual4" => Ok(Plan::Annual4),
            "annual8" => Ok(Plan::Annual8),
            _ => Err(Error::Business(ErrorCode::InvalidPlan)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

/// A purchased plan instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan: Plan,
    /// Final price after any coupon discount.
    pub price: f64,
    pub original_price: f64,
    /// Discount percentage (0 or 20).
    pub discount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    /// Set iff the coupon resolved to an employee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub letters_used: u32,
    pub letters_allowed: u32,
}

impl Subscription {
    /// Active and unexpired at `now`. Expiry is derived, never swept.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.expires_at.map_or(true, |e| e > now)
    }

    pub fn has_quota(&self) -> bool {
        self.letters_used < self.letters_allowed
    }
}

/// Tags for audit-log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    UserSignup,
    UserSignin,
    UserSignout,
    LetterCreated,
    LetterCompleted,
    LetterFailed,
    LetterDeleted,
    LetterDownloaded,
    SubscriptionCreated,
    EmployeeCredited,
}

/// One append-only activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Read-side aggregate snapshot for dashboards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub total_users: u64,
    pub total_employees: u64,
    pub total_letters: u64,
    pub total_revenue: f64,
    pub active_subscriptions: u64,
    /// Subscriptions per user, as a percentage. Zero when there are no users.
    pub conversion_rate: f64,
}
