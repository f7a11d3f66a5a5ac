//! Wallet Use Case
//!
//! Balance lookup and the withdrawal workflow. A request only records
//! intent; funds move when an admin approves, at which point the balance is
//! re-checked and debited together with the status change.

use std::sync::Arc;

use kernel::clock::Clock;
use kernel::id::{AccountId, WithdrawalId};

use crate::application::config::BoardConfig;
use crate::application::notifications::Notifier;
use crate::domain::entity::notification::NotificationKind;
use crate::domain::entity::withdrawal::Withdrawal;
use crate::domain::repository::{AccountRepository, NotificationRepository, WithdrawalRepository};
use crate::error::{BoardError, BoardResult};

/// Withdrawal request input
pub struct WithdrawalInput {
    pub amount: i64,
    pub method: String,
    pub address: String,
}

/// Wallet use case
pub struct WalletUseCase<A, W, N>
where
    A: AccountRepository,
    W: WithdrawalRepository,
    N: NotificationRepository,
{
    accounts: Arc<A>,
    withdrawals: Arc<W>,
    notifier: Notifier<N>,
    config: Arc<BoardConfig>,
    clock: Arc<dyn Clock>,
}

impl<A, W, N> WalletUseCase<A, W, N>
where
    A: AccountRepository,
    W: WithdrawalRepository,
    N: NotificationRepository,
{
    pub fn new(
        accounts: Arc<A>,
        withdrawals: Arc<W>,
        notifications: Arc<N>,
        config: Arc<BoardConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            withdrawals,
            notifier: Notifier::new(notifications, clock.clone()),
            config,
            clock,
        }
    }

    pub async fn balance(&self, account_id: &AccountId) -> BoardResult<i64> {
        self.accounts
            .find_account(account_id)
            .await?
            .map(|a| a.balance)
            .ok_or(BoardError::AccountNotFound)
    }

    /// Record a pending withdrawal; the balance is not touched yet
    pub async fn request_withdrawal(
        &self,
        account_id: &AccountId,
        input: WithdrawalInput,
    ) -> BoardResult<Withdrawal> {
        let method = input.method.trim().to_string();
        let address = input.address.trim().to_string();
        if method.is_empty() || address.is_empty() {
            return Err(BoardError::Validation(
                "Withdrawal method and address are required".into(),
            ));
        }
        if input.amount < self.config.min_withdrawal {
            return Err(BoardError::Validation(format!(
                "Minimum withdrawal is {}",
                self.config.min_withdrawal
            )));
        }

        let account = self
            .accounts
            .find_account(account_id)
            .await?
            .ok_or(BoardError::AccountNotFound)?;

        if !account.admin_verified {
            return Err(BoardError::Forbidden(
                "Only verified accounts can withdraw".into(),
            ));
        }
        if input.amount > account.balance {
            return Err(BoardError::InsufficientBalance);
        }

        let withdrawal = Withdrawal::new(*account_id, input.amount, method, address, self.clock.now());
        self.withdrawals.create_withdrawal(&withdrawal).await?;

        tracing::info!(
            account_id = %account_id,
            withdrawal_id = %withdrawal.id,
            amount = withdrawal.amount,
            "Withdrawal requested"
        );

        Ok(withdrawal)
    }

    /// Oldest first
    pub async fn list_pending(&self) -> BoardResult<Vec<Withdrawal>> {
        self.withdrawals.list_pending_withdrawals().await
    }

    pub async fn approve(&self, id: &WithdrawalId) -> BoardResult<Withdrawal> {
        let withdrawal = self
            .withdrawals
            .approve_withdrawal(id, self.clock.now())
            .await?;

        tracing::info!(
            withdrawal_id = %id,
            account_id = %withdrawal.account_id,
            amount = withdrawal.amount,
            "Withdrawal approved"
        );
        self.notifier
            .emit(
                &withdrawal.account_id,
                "Withdrawal Approved",
                format!(
                    "Your withdrawal of {} via {} has been approved.",
                    withdrawal.amount, withdrawal.method
                ),
                NotificationKind::Success,
            )
            .await;

        Ok(withdrawal)
    }

    pub async fn reject(&self, id: &WithdrawalId) -> BoardResult<Withdrawal> {
        let withdrawal = self
            .withdrawals
            .reject_withdrawal(id, self.clock.now())
            .await?;

        tracing::info!(
            withdrawal_id = %id,
            account_id = %withdrawal.account_id,
            "Withdrawal rejected"
        );
        self.notifier
            .emit(
                &withdrawal.account_id,
                "Withdrawal Rejected",
                format!(
                    "Your withdrawal of {} via {} was rejected.",
                    withdrawal.amount, withdrawal.method
                ),
                NotificationKind::Warning,
            )
            .await;

        Ok(withdrawal)
    }
}
