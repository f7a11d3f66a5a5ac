//! Account Entity
//!
//! Identity and entitlement record of a job seeker: credentials, verification
//! grants, pending one-time codes, the connects quota, the application
//! history and the wallet balance.
//!
//! Every mutating method here is pure and runs inside
//! `AccountRepository::modify_account`, so each transition is applied to a
//! locked, freshly loaded copy of the account.

use chrono::{DateTime, Duration, Utc};
use kernel::id::AccountId;
use platform::crypto::constant_time_eq;
use serde::Serialize;

use crate::domain::value_object::{
    credential::CredentialHash, email::Email, phone::PhoneNumber,
};
use crate::error::{BoardError, BoardResult};

// ============================================================================
// Supporting types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    #[default]
    User,
    Admin,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::User => "user",
            AccountRole::Admin => "admin",
        }
    }

    pub fn from_db(value: &str) -> BoardResult<Self> {
        match value {
            "user" => Ok(AccountRole::User),
            "admin" => Ok(AccountRole::Admin),
            other => Err(BoardError::Internal(format!("Unknown account role: {other}"))),
        }
    }
}

/// What a one-time code authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodePurpose {
    EmailVerify,
    PasswordReset,
}

impl CodePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePurpose::EmailVerify => "email_verify",
            CodePurpose::PasswordReset => "password_reset",
        }
    }
}

/// Issued, not yet consumed code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingCode {
    /// Expired from the instant the TTL elapses
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Which grants lift the connects limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnlimitedPolicy {
    #[default]
    AdminOrPayment,
    AdminOnly,
    PaymentOnly,
}

/// Effective verification level at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "expiresAt", rename_all = "camelCase")]
pub enum Verification {
    Unverified,
    EmailVerified,
    AdminVerified,
    PaymentVerified(DateTime<Utc>),
}

/// Job description supplied by the caller when applying
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobMeta {
    pub title: String,
    pub company: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub description: String,
    pub applied_at: DateTime<Utc>,
}

/// Non-error results of an apply; both carry the post-operation balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { connects: u32 },
    AlreadyApplied { connects: u32 },
}

impl ApplyOutcome {
    pub fn connects(&self) -> u32 {
        match self {
            ApplyOutcome::Applied { connects } | ApplyOutcome::AlreadyApplied { connects } => {
                *connects
            }
        }
    }
}

// ============================================================================
// Account
// ============================================================================

#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: Email,
    pub phone: Option<PhoneNumber>,
    pub credential: CredentialHash,
    pub role: AccountRole,
    pub email_verified: bool,
    pub admin_verified: bool,
    /// End of the paid unlimited window
    pub payment_verified_until: Option<DateTime<Utc>>,
    pub email_code: Option<PendingCode>,
    pub reset_code: Option<PendingCode>,
    pub connects: u32,
    /// Ordered by `applied_at`; `job_id` is unique
    pub applications: Vec<JobApplication>,
    /// Wallet balance in minor units
    pub balance: i64,
    /// Bearer tokens carry this; bumping it signs the account out everywhere
    pub session_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        name: String,
        email: Email,
        phone: Option<PhoneNumber>,
        credential: CredentialHash,
        free_connects: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            name,
            email,
            phone,
            credential,
            role: AccountRole::User,
            email_verified: false,
            admin_verified: false,
            payment_verified_until: None,
            email_code: None,
            reset_code: None,
            connects: free_connects,
            applications: Vec::new(),
            balance: 0,
            session_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------

    pub fn has_active_payment(&self, now: DateTime<Utc>) -> bool {
        matches!(self.payment_verified_until, Some(until) if now < until)
    }

    /// Highest active grant wins: payment, then admin, then email
    pub fn verification(&self, now: DateTime<Utc>) -> Verification {
        match self.payment_verified_until {
            Some(until) if now < until => Verification::PaymentVerified(until),
            _ if self.admin_verified => Verification::AdminVerified,
            _ if self.email_verified => Verification::EmailVerified,
            _ => Verification::Unverified,
        }
    }

    pub fn is_unlimited(&self, policy: UnlimitedPolicy, now: DateTime<Utc>) -> bool {
        match policy {
            UnlimitedPolicy::AdminOrPayment => self.admin_verified || self.has_active_payment(now),
            UnlimitedPolicy::AdminOnly => self.admin_verified,
            UnlimitedPolicy::PaymentOnly => self.has_active_payment(now),
        }
    }

    /// Returns false when the grant was already present
    pub fn grant_admin_verification(&mut self, now: DateTime<Utc>) -> bool {
        if self.admin_verified {
            return false;
        }
        self.admin_verified = true;
        self.updated_at = now;
        true
    }

    pub fn revoke_admin_verification(&mut self, now: DateTime<Utc>) -> bool {
        if !self.admin_verified {
            return false;
        }
        self.admin_verified = false;
        self.revoke_sessions();
        self.updated_at = now;
        true
    }

    /// Invalidate every token issued so far
    pub fn revoke_sessions(&mut self) {
        self.session_version = self.session_version.wrapping_add(1);
    }

    // ------------------------------------------------------------------
    // One-time codes
    // ------------------------------------------------------------------

    pub fn pending_code(&self, purpose: CodePurpose) -> Option<&PendingCode> {
        match purpose {
            CodePurpose::EmailVerify => self.email_code.as_ref(),
            CodePurpose::PasswordReset => self.reset_code.as_ref(),
        }
    }

    fn code_slot(&mut self, purpose: CodePurpose) -> &mut Option<PendingCode> {
        match purpose {
            CodePurpose::EmailVerify => &mut self.email_code,
            CodePurpose::PasswordReset => &mut self.reset_code,
        }
    }

    /// Replace any earlier code of the same purpose
    pub fn set_pending_code(&mut self, purpose: CodePurpose, code: PendingCode, now: DateTime<Utc>) {
        *self.code_slot(purpose) = Some(code);
        self.updated_at = now;
    }

    /// Check and clear a code, then apply its purpose effect
    pub fn consume_code(
        &mut self,
        purpose: CodePurpose,
        supplied: &str,
        now: DateTime<Utc>,
    ) -> BoardResult<()> {
        let slot = self.code_slot(purpose);
        let Some(pending) = slot.as_ref() else {
            return Err(BoardError::InvalidCode);
        };
        if pending.is_expired(now) {
            return Err(BoardError::CodeExpired);
        }
        if !constant_time_eq(pending.code.as_bytes(), supplied.trim().as_bytes()) {
            return Err(BoardError::InvalidCode);
        }
        *slot = None;

        if purpose == CodePurpose::EmailVerify {
            self.email_verified = true;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Consume a reset code and swap the credential as one step
    pub fn reset_password(
        &mut self,
        supplied: &str,
        credential: CredentialHash,
        verifies_email: bool,
        now: DateTime<Utc>,
    ) -> BoardResult<()> {
        self.consume_code(CodePurpose::PasswordReset, supplied, now)?;
        self.credential = credential;
        self.revoke_sessions();
        if verifies_email {
            self.email_verified = true;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Quota
    // ------------------------------------------------------------------

    pub fn has_applied(&self, job_id: &str) -> bool {
        self.applications.iter().any(|a| a.job_id == job_id)
    }

    pub fn apply(
        &mut self,
        job_id: &str,
        meta: JobMeta,
        unlimited: bool,
        now: DateTime<Utc>,
    ) -> BoardResult<ApplyOutcome> {
        if self.has_applied(job_id) {
            return Ok(ApplyOutcome::AlreadyApplied {
                connects: self.connects,
            });
        }
        if !unlimited && self.connects == 0 {
            return Err(BoardError::QuotaExceeded);
        }

        if !unlimited {
            self.connects = self.connects.saturating_sub(1);
        }
        self.applications.push(JobApplication {
            job_id: job_id.to_string(),
            title: meta.title,
            company: meta.company,
            description: meta.description,
            applied_at: now,
        });
        self.updated_at = now;

        Ok(ApplyOutcome::Applied {
            connects: self.connects,
        })
    }

    /// Credit a confirmed payment unless a paid window is still open.
    /// Returns whether anything was credited.
    pub fn credit_payment(&mut self, connects_grant: u32, validity: Duration, now: DateTime<Utc>) -> bool {
        if self.has_active_payment(now) {
            return false;
        }
        self.connects = self.connects.saturating_add(connects_grant);
        self.payment_verified_until = Some(now + validity);
        self.updated_at = now;
        true
    }

    /// Add or remove connects, clamped to `0..=u32::MAX`
    pub fn adjust_connects(&mut self, delta: i64, now: DateTime<Utc>) -> u32 {
        let adjusted = (i64::from(self.connects) + delta).clamp(0, i64::from(u32::MAX));
        self.connects = u32::try_from(adjusted).unwrap_or(u32::MAX);
        self.updated_at = now;
        self.connects
    }

    // ------------------------------------------------------------------
    // Wallet
    // ------------------------------------------------------------------

    pub fn debit(&mut self, amount: i64, now: DateTime<Utc>) -> BoardResult<i64> {
        if amount <= 0 {
            return Err(BoardError::Validation("Amount must be positive".into()));
        }
        if amount > self.balance {
            return Err(BoardError::InsufficientBalance);
        }
        self.balance -= amount;
        self.updated_at = now;
        Ok(self.balance)
    }
}
