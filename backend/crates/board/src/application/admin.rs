//! Admin Use Case
//!
//! Manual verification grants and connects adjustments.

use std::sync::Arc;

use kernel::clock::Clock;
use kernel::id::AccountId;

use crate::application::notifications::Notifier;
use crate::domain::entity::account::Account;
use crate::domain::entity::notification::NotificationKind;
use crate::domain::repository::{AccountRepository, NotificationRepository};
use crate::error::BoardResult;

/// Admin use case
pub struct AdminUseCase<A, N>
where
    A: AccountRepository,
    N: NotificationRepository,
{
    accounts: Arc<A>,
    notifier: Notifier<N>,
    clock: Arc<dyn Clock>,
}

impl<A, N> AdminUseCase<A, N>
where
    A: AccountRepository,
    N: NotificationRepository,
{
    pub fn new(accounts: Arc<A>, notifications: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts,
            notifier: Notifier::new(notifications, clock.clone()),
            clock,
        }
    }

    /// Grant admin verification; a no-op if already granted.
    /// Allowed from any state, including unverified email.
    pub async fn grant_verification(&self, account_id: &AccountId) -> BoardResult<Account> {
        let now = self.clock.now();
        let (changed, account) = self
            .accounts
            .modify_account(account_id, |a| {
                let changed = a.grant_admin_verification(now);
                Ok((changed, a.clone()))
            })
            .await?;

        if changed {
            tracing::info!(account_id = %account_id, "Admin verification granted");
            self.notifier
                .emit(
                    account_id,
                    "Account Verified",
                    "Your account has been verified. You can now apply to jobs without limits.",
                    NotificationKind::Success,
                )
                .await;
        }

        Ok(account)
    }

    /// Clear admin verification. Connects and payment grants are untouched.
    pub async fn revoke_verification(&self, account_id: &AccountId) -> BoardResult<Account> {
        let now = self.clock.now();
        let (changed, account) = self
            .accounts
            .modify_account(account_id, |a| {
                let changed = a.revoke_admin_verification(now);
                Ok((changed, a.clone()))
            })
            .await?;

        if changed {
            tracing::info!(account_id = %account_id, "Admin verification revoked");
        }

        Ok(account)
    }

    /// Add (positive) or remove (negative) connects; never drops below zero
    pub async fn adjust_connects(&self, account_id: &AccountId, delta: i64) -> BoardResult<u32> {
        let now = self.clock.now();
        let connects = self
            .accounts
            .modify_account(account_id, |a| Ok(a.adjust_connects(delta, now)))
            .await?;

        tracing::info!(account_id = %account_id, delta, connects, "Connects adjusted");

        if delta > 0 {
            self.notifier
                .emit(
                    account_id,
                    "Connects Added",
                    format!("{delta} connects were added to your account."),
                    NotificationKind::Success,
                )
                .await;
        }

        Ok(connects)
    }
}
