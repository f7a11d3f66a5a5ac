//! Payment Record Entity
//!
//! One record per STK push attempt. Leaves `Pending` exactly once.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, PaymentId};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_object::phone::PhoneNumber;
use crate::error::{BoardError, BoardResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_db(value: &str) -> BoardResult<Self> {
        match value {
            "pending" => Ok(PaymentStatus::Pending),
            "success" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(BoardError::Internal(format!("Unknown payment status: {other}"))),
        }
    }

    /// Terminal status reported by the gateway; anything but success is a failure
    pub fn from_callback(reported: &str) -> Self {
        if reported.trim().eq_ignore_ascii_case("success") {
            PaymentStatus::Success
        } else {
            PaymentStatus::Failed
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub account_id: AccountId,
    /// Minor units of `currency`
    pub amount: i64,
    pub currency: String,
    pub phone: PhoneNumber,
    /// Connects added when this payment succeeds
    pub connects_grant: u32,
    pub external_reference: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(
        account_id: AccountId,
        amount: i64,
        currency: impl Into<String>,
        phone: PhoneNumber,
        connects_grant: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            account_id,
            amount,
            currency: currency.into(),
            phone,
            connects_grant,
            external_reference: new_external_reference(),
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Reference the gateway echoes back in its callback
fn new_external_reference() -> String {
    format!("CNX-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}
