//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the
//! infrastructure layer (`PgBoardRepository`, `MemoryBoardRepository`).

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, NotificationId, WithdrawalId};

use crate::domain::entity::{
    account::Account,
    notification::Notification,
    payment::{PaymentRecord, PaymentStatus},
    withdrawal::Withdrawal,
};
use crate::domain::value_object::email::Email;
use crate::error::BoardResult;

/// Account store
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Insert a new account; `EmailTaken` if the email is registered
    async fn create_account(&self, account: &Account) -> BoardResult<()>;

    async fn find_account(&self, id: &AccountId) -> BoardResult<Option<Account>>;

    async fn find_account_by_email(&self, email: &Email) -> BoardResult<Option<Account>>;

    /// Atomic read-modify-write of one account
    ///
    /// `f` runs against the current state while every other writer of the
    /// same account waits. The result is persisted only when `f` returns
    /// `Ok`; on `Err` the stored account is left exactly as it was.
    /// `AccountNotFound` if the account does not exist.
    ///
    /// `f` must not perform I/O.
    async fn modify_account<T, F>(&self, id: &AccountId, f: F) -> BoardResult<T>
    where
        F: FnOnce(&mut Account) -> BoardResult<T> + Send,
        T: Send;
}

/// Payment record store
#[trait_variant::make(PaymentRepository: Send)]
pub trait LocalPaymentRepository {
    async fn create_payment(&self, payment: &PaymentRecord) -> BoardResult<()>;

    async fn find_payment_by_reference(
        &self,
        external_reference: &str,
    ) -> BoardResult<Option<PaymentRecord>>;

    /// Compare-and-swap `Pending -> status`
    ///
    /// Returns the updated record, or `None` if the reference is unknown or
    /// the payment already left `Pending`.
    async fn settle_payment(
        &self,
        external_reference: &str,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> BoardResult<Option<PaymentRecord>>;

    /// `Pending -> Success` and credit the owner as one step
    ///
    /// `credit` runs against the payment's account while both rows are
    /// locked. Both writes are kept only when it returns `Ok`; on `Err`
    /// the payment stays `Pending` and the account is untouched, so a later
    /// delivery can still settle it. `None` if the reference is unknown or
    /// the payment already left `Pending`.
    ///
    /// `credit` must not perform I/O.
    async fn settle_and_credit<T, F>(
        &self,
        external_reference: &str,
        now: DateTime<Utc>,
        credit: F,
    ) -> BoardResult<Option<(PaymentRecord, T)>>
    where
        F: FnOnce(&mut Account, &PaymentRecord) -> BoardResult<T> + Send,
        T: Send;

    /// Newest first
    async fn list_payments(&self, account_id: &AccountId) -> BoardResult<Vec<PaymentRecord>>;
}

/// Notification inbox store
#[trait_variant::make(NotificationRepository: Send)]
pub trait LocalNotificationRepository {
    async fn push_notification(&self, notification: &Notification) -> BoardResult<()>;

    /// Newest first
    async fn list_notifications(&self, account_id: &AccountId) -> BoardResult<Vec<Notification>>;

    /// False if no such notification belongs to the account
    async fn mark_notification_read(
        &self,
        account_id: &AccountId,
        id: &NotificationId,
    ) -> BoardResult<bool>;

    async fn mark_all_notifications_read(&self, account_id: &AccountId) -> BoardResult<u64>;
}

/// Withdrawal store
#[trait_variant::make(WithdrawalRepository: Send)]
pub trait LocalWithdrawalRepository {
    async fn create_withdrawal(&self, withdrawal: &Withdrawal) -> BoardResult<()>;

    async fn find_withdrawal(&self, id: &WithdrawalId) -> BoardResult<Option<Withdrawal>>;

    /// Oldest first
    async fn list_pending_withdrawals(&self) -> BoardResult<Vec<Withdrawal>>;

    /// `Pending -> Approved` and debit the owner's balance as one step
    ///
    /// `AlreadyDecided` if not pending, `InsufficientBalance` if the balance
    /// no longer covers the amount (the withdrawal then stays pending).
    async fn approve_withdrawal(
        &self,
        id: &WithdrawalId,
        now: DateTime<Utc>,
    ) -> BoardResult<Withdrawal>;

    /// `Pending -> Rejected`; `AlreadyDecided` if not pending
    async fn reject_withdrawal(
        &self,
        id: &WithdrawalId,
        now: DateTime<Utc>,
    ) -> BoardResult<Withdrawal>;
}

/// Everything the HTTP layer needs from one storage backend
pub trait BoardStore:
    AccountRepository
    + PaymentRepository
    + NotificationRepository
    + WithdrawalRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> BoardStore for T where
    T: AccountRepository
        + PaymentRepository
        + NotificationRepository
        + WithdrawalRepository
        + Send
        + Sync
        + 'static
{
}
