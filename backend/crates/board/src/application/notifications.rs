//! Notifications
//!
//! `Notifier` is the best-effort sink the other use cases write through:
//! a failed insert is logged and never fails the operation that caused it.
//! `NotificationsUseCase` serves the inbox.

use std::sync::Arc;

use kernel::clock::Clock;
use kernel::id::{AccountId, NotificationId};

use crate::domain::entity::notification::{Notification, NotificationKind};
use crate::domain::repository::NotificationRepository;
use crate::error::{BoardError, BoardResult};

/// Side-effect notification writer
pub struct Notifier<N>
where
    N: NotificationRepository,
{
    repo: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<N> Notifier<N>
where
    N: NotificationRepository,
{
    pub fn new(repo: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn emit(
        &self,
        account_id: &AccountId,
        title: &str,
        message: impl Into<String>,
        kind: NotificationKind,
    ) {
        let notification = Notification::new(*account_id, title, message, kind, self.clock.now());

        if let Err(e) = self.repo.push_notification(&notification).await {
            tracing::warn!(
                account_id = %account_id,
                title,
                error = %e,
                "Failed to store notification"
            );
        }
    }
}

/// Inbox use case
pub struct NotificationsUseCase<N>
where
    N: NotificationRepository,
{
    repo: Arc<N>,
}

impl<N> NotificationsUseCase<N>
where
    N: NotificationRepository,
{
    pub fn new(repo: Arc<N>) -> Self {
        Self { repo }
    }

    /// Newest first
    pub async fn list(&self, account_id: &AccountId) -> BoardResult<Vec<Notification>> {
        self.repo.list_notifications(account_id).await
    }

    pub async fn mark_read(&self, account_id: &AccountId, id: &NotificationId) -> BoardResult<()> {
        if !self.repo.mark_notification_read(account_id, id).await? {
            return Err(BoardError::NotificationNotFound);
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, account_id: &AccountId) -> BoardResult<u64> {
        let updated = self.repo.mark_all_notifications_read(account_id).await?;
        tracing::debug!(account_id = %account_id, updated, "Marked notifications read");
        Ok(updated)
    }
}
