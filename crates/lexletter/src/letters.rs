// Letter store.
//
// Owns letter records and the simulated generation lifecycle. `create_letter`
// returns synchronously with a pending record; a detached task advances it to
// processing, waits out the simulated generation delay, and lands on
// completed (or failed). The task is fire-and-forget: there is no
// cancellation, and a letter that disappeared mid-flight is a no-op.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lexletter_core::error::{Error, ErrorCode, Result};
use lexletter_core::id::generate_id;
use lexletter_core::models::{AuditAction, Letter, LetterMetadata, LetterStatus, Role};
use rand::Rng;
use serde_json::json;

use crate::audit::AuditLog;
use crate::context::AppContext;
use crate::identity::IdentityStore;
use crate::subscriptions::SubscriptionStore;

/// Input for a new letter.
#[derive(Debug, Clone)]
pub struct LetterRequest {
    pub user_id: String,
    pub sender_name: String,
    pub sender_address: String,
    pub recipient_name: String,
    pub recipient_address: String,
    pub matter: String,
    pub resolution: String,
}

#[derive(Clone)]
pub struct LetterStore {
    ctx: Arc<AppContext>,
    audit: AuditLog,
    identity: IdentityStore,
    subscriptions: SubscriptionStore,
}

impl LetterStore {
    pub(crate) fn new(
        ctx: Arc<AppContext>,
        audit: AuditLog,
        identity: IdentityStore,
        subscriptions: SubscriptionStore,
    ) -> Self {
        Self {
            ctx,
            audit,
            identity,
            subscriptions,
        }
    }

    /// Create a letter and schedule its generation.
    ///
    /// The caller must be the authenticated session user, hold the `user`
    /// role, and have spare quota on an active subscription. Returns the
    /// letter as created (status pending); later states are observed by
    /// re-listing.
    pub async fn create_letter(&self, request: LetterRequest) -> Result<Letter> {
        self.create_letter_inner(request)
            .await
            .map_err(|e| e.wrap_unexpected(ErrorCode::CreationFailed))
    }

    async fn create_letter_inner(&self, request: LetterRequest) -> Result<Letter> {
        let Some(current) = self.identity.current_user().await? else {
            return Err(Error::Authentication(ErrorCode::NotAuthenticated));
        };
        if current.id != request.user_id {
            return Err(Error::Authorization(ErrorCode::AccessDenied));
        }
        if current.role != Role::User {
            return Err(Error::Authorization(ErrorCode::InsufficientPermissions));
        }
        validate_request(&request)?;

        let Some(subscription) = self.subscriptions.active_subscription(&request.user_id).await?
        else {
            return Err(Error::Business(ErrorCode::NoSubscription));
        };
        if !subscription.has_quota() {
            return Err(Error::Business(ErrorCode::QuotaExceeded));
        }

        self.subscriptions
            .consume_letter_credit(&subscription.id)
            .await?;

        let letter = Letter {
            id: generate_id(),
            user_id: request.user_id.clone(),
            sender_name: request.sender_name.trim().to_string(),
            sender_address: request.sender_address.trim().to_string(),
            recipient_name: request.recipient_name.trim().to_string(),
            recipient_address: request.recipient_address.trim().to_string(),
            matter: request.matter.trim().to_string(),
            resolution: request.resolution.trim().to_string(),
            content: String::new(),
            status: LetterStatus::Pending,
            generated_at: Utc::now(),
            completed_at: None,
            version: 1,
            metadata: LetterMetadata::default(),
            is_deleted: false,
            download_count: 0,
        };

        let mut letters = self.ctx.load_letters().await?;
        letters.push(letter.clone());
        self.ctx.save_letters(&letters).await?;

        self.audit
            .record(
                AuditAction::LetterCreated,
                Some(&request.user_id),
                json!({ "letterId": letter.id, "matter": letter.matter }),
            )
            .await;

        let store = self.clone();
        let letter_id = letter.id.clone();
        tokio::spawn(async move {
            store.run_generation(letter_id).await;
        });

        Ok(letter)
    }

    /// The detached generation pipeline. Failures are absorbed into the
    /// letter's own status — there is no caller left to report to.
    async fn run_generation(&self, letter_id: String) {
        if let Err(err) = self.advance_to_completed(&letter_id).await {
            self.ctx
                .logger
                .warn(&format!("letter {letter_id} generation failed: {err}"));
            self.mark_failed(&letter_id).await;
        }
    }

    async fn advance_to_completed(&self, letter_id: &str) -> Result<()> {
        // pending -> processing
        {
            let mut letters = self.ctx.load_letters().await?;
            let Some(letter) = letters.iter_mut().find(|l| l.id == letter_id) else {
                return Ok(());
            };
            letter.status = LetterStatus::Processing;
            letter.version += 1;
            self.ctx.save_letters(&letters).await?;
        }

        let delay = self.ctx.options.processing_delay;
        tokio::time::sleep(delay).await;

        // processing -> completed
        let now = Utc::now();
        let mut letters = self.ctx.load_letters().await?;
        let Some(letter) = letters.iter_mut().find(|l| l.id == letter_id) else {
            return Ok(());
        };
        let content = render_letter(letter, now, &self.ctx.options.app_name);
        letter.metadata.word_count = content.split_whitespace().count() as u32;
        letter.metadata.processing_time = delay.as_secs_f64();
        letter.metadata.confidence_score = 0.85 + rand::thread_rng().gen_range(0.0..0.1);
        letter.content = content;
        letter.status = LetterStatus::Completed;
        letter.completed_at = Some(now);
        letter.version += 1;
        let user_id = letter.user_id.clone();
        let version = letter.version;
        self.ctx.save_letters(&letters).await?;

        self.audit
            .record(
                AuditAction::LetterCompleted,
                Some(&user_id),
                json!({ "letterId": letter_id, "version": version }),
            )
            .await;
        Ok(())
    }

    /// Best-effort transition to failed. Nothing to do if the letter is gone
    /// or already finished.
    async fn mark_failed(&self, letter_id: &str) {
        let Ok(mut letters) = self.ctx.load_letters().await else {
            return;
        };
        let Some(letter) = letters
            .iter_mut()
            .find(|l| l.id == letter_id && l.status != LetterStatus::Completed)
        else {
            return;
        };
        letter.status = LetterStatus::Failed;
        letter.version += 1;
        let user_id = letter.user_id.clone();
        if self.ctx.save_letters(&letters).await.is_ok() {
            self.audit
                .record(
                    AuditAction::LetterFailed,
                    Some(&user_id),
                    json!({ "letterId": letter_id }),
                )
                .await;
        }
    }

    /// Letters belonging to `user_id`, newest first, excluding soft-deleted.
    pub async fn letters_for_user(&self, user_id: &str) -> Result<Vec<Letter>> {
        let mut letters: Vec<Letter> = self
            .ctx
            .load_letters()
            .await?
            .into_iter()
            .filter(|l| l.user_id == user_id && !l.is_deleted)
            .collect();
        letters.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(letters)
    }

    /// Admin read surface, excluding soft-deleted.
    pub async fn all_letters(&self) -> Result<Vec<Letter>> {
        let letters = self.ctx.load_letters().await?;
        Ok(letters.into_iter().filter(|l| !l.is_deleted).collect())
    }

    /// Soft-delete a letter. Owners may delete their own; admins any.
    pub async fn delete_letter(&self, caller_id: &str, letter_id: &str) -> Result<()> {
        let caller = self
            .identity
            .user_by_id(caller_id)
            .await?
            .ok_or(Error::NotFound(ErrorCode::UserNotFound))?;

        let mut letters = self.ctx.load_letters().await?;
        let Some(letter) = letters
            .iter_mut()
            .find(|l| l.id == letter_id && !l.is_deleted)
        else {
            return Err(Error::NotFound(ErrorCode::LetterNotFound));
        };
        if letter.user_id != caller.id && caller.role != Role::Admin {
            return Err(Error::Authorization(ErrorCode::AccessDenied));
        }
        letter.is_deleted = true;
        let user_id = letter.user_id.clone();
        self.ctx.save_letters(&letters).await?;

        self.audit
            .record(
                AuditAction::LetterDeleted,
                Some(&user_id),
                json!({ "letterId": letter_id }),
            )
            .await;
        Ok(())
    }

    /// Count a download of a completed letter.
    pub async fn record_download(&self, letter_id: &str) -> Result<()> {
        let mut letters = self.ctx.load_letters().await?;
        let Some(letter) = letters
            .iter_mut()
            .find(|l| l.id == letter_id && !l.is_deleted)
        else {
            return Err(Error::NotFound(ErrorCode::LetterNotFound));
        };
        letter.download_count += 1;
        let user_id = letter.user_id.clone();
        self.ctx.save_letters(&letters).await?;

        self.audit
            .record(
                AuditAction::LetterDownloaded,
                Some(&user_id),
                json!({ "letterId": letter_id }),
            )
            .await;
        Ok(())
    }
}

fn validate_request(request: &LetterRequest) -> Result<()> {
    let fields: [(&str, &'static str); 6] = [
        (&request.sender_name, "senderName"),
        (&request.sender_address, "senderAddress"),
        (&request.recipient_name, "recipientName"),
        (&request.recipient_address, "recipientAddress"),
        (&request.matter, "matter"),
        (&request.resolution, "resolution"),
    ];
    for (value, name) in fields {
        if value.trim().is_empty() {
            return Err(Error::validation(ErrorCode::MissingField, name));
        }
    }
    Ok(())
}

/// Render the letter body from its stored fields.
///
/// Deterministic template substitution: the same fields always produce the
/// same text apart from the embedded date stamp.
pub fn render_letter(letter: &Letter, date: DateTime<Utc>, app_name: &str) -> String {
    let date_line = date.format("%B %-d, %Y").to_string();
    let first_name = letter
        .recipient_name
        .split_whitespace()
        .next()
        .unwrap_or(letter.recipient_name.as_str());
    let reference = letter.id.chars().take(8).collect::<String>();

    format!(
        "{sender}\n{sender_address}\n\n{date_line}\n\n{recipient}\n{recipient_address}\n\n\
         Re: {matter}\n\n\
         Dear {first_name},\n\n\
         I am writing to formally address the matter concerning {matter_lower}.\n\n\
         {resolution}\n\n\
         This correspondence serves as official notice and documentation of our position \
         regarding this matter. We expect your prompt attention and response to facilitate \
         a timely resolution.\n\n\
         Please be advised that failure to respond within thirty (30) days of receipt of \
         this letter may result in further legal action being taken to protect our \
         interests and enforce our rights under applicable law.\n\n\
         We remain open to discussing this matter in good faith and look forward to your \
         prompt response.\n\n\
         Sincerely,\n\n{sender}\n\n---\n\
         This letter was generated using {app_name}\n\
         Generated on: {date_line}\n\
         Reference: {reference}",
        sender = letter.sender_name,
        sender_address = letter.sender_address,
        recipient = letter.recipient_name,
        recipient_address = letter.recipient_address,
        matter = letter.matter,
        matter_lower = letter.matter.to_lowercase(),
        resolution = letter.resolution,
    )
}
