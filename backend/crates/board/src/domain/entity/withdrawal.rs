//! Withdrawal Entity
//!
//! Payout request against the wallet balance. The balance is only debited
//! when an admin approves; a request never reserves funds.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, WithdrawalId};
use serde::Serialize;

use crate::error::{BoardError, BoardResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn from_db(value: &str) -> BoardResult<Self> {
        match value {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(BoardError::Internal(format!(
                "Unknown withdrawal status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub account_id: AccountId,
    /// Minor units
    pub amount: i64,
    /// Payout channel, e.g. "mpesa" or "paypal"
    pub method: String,
    /// Destination on that channel
    pub address: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Withdrawal {
    pub fn new(
        account_id: AccountId,
        amount: i64,
        method: String,
        address: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WithdrawalId::new(),
            account_id,
            amount,
            method,
            address,
            status: WithdrawalStatus::Pending,
            created_at: now,
            decided_at: None,
        }
    }

    /// Move out of `Pending`; fails if already decided
    pub fn decide(&mut self, status: WithdrawalStatus, now: DateTime<Utc>) -> BoardResult<()> {
        if self.status != WithdrawalStatus::Pending {
            return Err(BoardError::AlreadyDecided);
        }
        self.status = status;
        self.decided_at = Some(now);
        Ok(())
    }
}
