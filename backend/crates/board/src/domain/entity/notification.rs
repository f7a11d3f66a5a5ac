//! Notification Entity
//!
//! Inbox entry. Append-only; `read` is the only field that changes.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, NotificationId};
use serde::Serialize;

use crate::error::{BoardError, BoardResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
        }
    }

    pub fn from_db(value: &str) -> BoardResult<Self> {
        match value {
            "info" => Ok(NotificationKind::Info),
            "success" => Ok(NotificationKind::Success),
            "warning" => Ok(NotificationKind::Warning),
            other => Err(BoardError::Internal(format!(
                "Unknown notification kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub account_id: AccountId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        account_id: AccountId,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            account_id,
            title: title.into(),
            message: message.into(),
            kind,
            read: false,
            created_at: now,
        }
    }
}
