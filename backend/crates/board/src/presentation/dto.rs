//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::account::{Account, AccountRole, JobApplication, Verification};
use crate::domain::entity::payment::{PaymentRecord, PaymentStatus};

// ============================================================================
// Registration / Login
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub account_id: String,
    pub email: String,
    pub connects: u32,
    /// False when the verification email could not be sent; the client
    /// should offer a resend
    pub verification_sent: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub account_id: String,
    pub token: String,
    pub expires_at_ms: i64,
    pub email_verified: bool,
}

// ============================================================================
// Verification codes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub code: String,
}

/// Resend verification / forgot password
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Account
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: AccountRole,
    pub email_verified: bool,
    pub admin_verified: bool,
    pub verification: Verification,
    pub unlimited: bool,
    pub connects: u32,
    pub balance: i64,
    pub applied_jobs: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl AccountResponse {
    pub fn from_account(account: &Account, unlimited: bool, now: DateTime<Utc>) -> Self {
        Self {
            id: account.id.to_string(),
            name: account.name.clone(),
            email: account.email.as_str().to_string(),
            phone: account.phone.as_ref().map(|p| p.as_str().to_string()),
            role: account.role,
            email_verified: account.email_verified,
            admin_verified: account.admin_verified,
            verification: account.verification(now),
            unlimited,
            connects: account.connects,
            balance: account.balance,
            applied_jobs: account.applications.iter().map(|a| a.job_id.clone()).collect(),
            created_at: account.created_at,
        }
    }
}

// ============================================================================
// Applications
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub title: String,
    pub company: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    pub applied: bool,
    pub already_applied: bool,
    pub connects: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationsResponse {
    pub applications: Vec<JobApplication>,
}

/// Body of the 402 returned when no connects are left
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaExceededResponse {
    pub message: String,
    pub requires_purchase: bool,
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

// ============================================================================
// Payments
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    pub phone: String,
    /// Defaults to the configured package price
    pub amount: Option<i64>,
}

/// The gateway reference stays server-side
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushResponse {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub phone: String,
    pub connects_grant: u32,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            id: record.id.to_string(),
            amount: record.amount,
            currency: record.currency,
            phone: record.phone.as_str().to_string(),
            connects_grant: record.connects_grant,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Gateway callback; the gateway has used both casings over time
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCallbackRequest {
    #[serde(alias = "externalReference", alias = "ExternalReference")]
    pub external_reference: String,
    #[serde(alias = "Status")]
    pub status: String,
}

// ============================================================================
// Wallet
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub balance: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub amount: i64,
    pub method: String,
    pub address: String,
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustConnectsRequest {
    pub delta: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectsResponse {
    pub connects: u32,
}
