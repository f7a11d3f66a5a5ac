//! In-Memory Repository
//!
//! Process-local store with the same atomicity contract as the PostgreSQL
//! one. Each account sits behind its own mutex; `modify_account` applies
//! the closure to a copy and writes it back only on success.
//!
//! Lock order is payments or withdrawals, then the account table, then one
//! account.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, NotificationId, WithdrawalId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::domain::entity::{
    account::Account,
    notification::Notification,
    payment::{PaymentRecord, PaymentStatus},
    withdrawal::{Withdrawal, WithdrawalStatus},
};
use crate::domain::repository::{
    AccountRepository, NotificationRepository, PaymentRepository, WithdrawalRepository,
};
use crate::domain::value_object::email::Email;
use crate::error::{BoardError, BoardResult};

#[derive(Clone, Default)]
pub struct MemoryBoardRepository {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    accounts: RwLock<AccountTable>,
    payments: Mutex<Vec<PaymentRecord>>,
    notifications: Mutex<Vec<Notification>>,
    withdrawals: Mutex<Vec<Withdrawal>>,
}

#[derive(Default)]
struct AccountTable {
    by_id: HashMap<AccountId, Arc<Mutex<Account>>>,
    by_email: HashMap<Email, AccountId>,
}

/// A panic inside a closure never leaves a half-written value behind,
/// so a poisoned lock is still safe to use.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryBoardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn account_slot(&self, id: &AccountId) -> Option<Arc<Mutex<Account>>> {
        let table = self.inner.accounts.read().unwrap_or_else(|e| e.into_inner());
        table.by_id.get(id).cloned()
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for MemoryBoardRepository {
    async fn create_account(&self, account: &Account) -> BoardResult<()> {
        let mut table = self.inner.accounts.write().unwrap_or_else(|e| e.into_inner());
        if table.by_email.contains_key(&account.email) {
            return Err(BoardError::EmailTaken);
        }
        table.by_email.insert(account.email.clone(), account.id);
        table
            .by_id
            .insert(account.id, Arc::new(Mutex::new(account.clone())));
        Ok(())
    }

    async fn find_account(&self, id: &AccountId) -> BoardResult<Option<Account>> {
        Ok(self.account_slot(id).map(|slot| lock(&slot).clone()))
    }

    async fn find_account_by_email(&self, email: &Email) -> BoardResult<Option<Account>> {
        let id = {
            let table = self.inner.accounts.read().unwrap_or_else(|e| e.into_inner());
            table.by_email.get(email).copied()
        };
        match id {
            Some(id) => self.find_account(&id).await,
            None => Ok(None),
        }
    }

    async fn modify_account<T, F>(&self, id: &AccountId, f: F) -> BoardResult<T>
    where
        F: FnOnce(&mut Account) -> BoardResult<T> + Send,
        T: Send,
    {
        let slot = self.account_slot(id).ok_or(BoardError::AccountNotFound)?;
        let mut stored = lock(&slot);

        let mut draft = stored.clone();
        let out = f(&mut draft)?;
        *stored = draft;

        Ok(out)
    }
}

// ============================================================================
// Payment Repository Implementation
// ============================================================================

impl PaymentRepository for MemoryBoardRepository {
    async fn create_payment(&self, payment: &PaymentRecord) -> BoardResult<()> {
        let mut payments = lock(&self.inner.payments);
        if payments
            .iter()
            .any(|p| p.external_reference == payment.external_reference)
        {
            return Err(BoardError::Internal(
                "Duplicate payment reference".to_string(),
            ));
        }
        payments.push(payment.clone());
        Ok(())
    }

    async fn find_payment_by_reference(
        &self,
        external_reference: &str,
    ) -> BoardResult<Option<PaymentRecord>> {
        let payments = lock(&self.inner.payments);
        Ok(payments
            .iter()
            .find(|p| p.external_reference == external_reference)
            .cloned())
    }

    async fn settle_payment(
        &self,
        external_reference: &str,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> BoardResult<Option<PaymentRecord>> {
        let mut payments = lock(&self.inner.payments);
        let Some(payment) = payments.iter_mut().find(|p| {
            p.external_reference == external_reference && p.status == PaymentStatus::Pending
        }) else {
            return Ok(None);
        };

        payment.status = status;
        payment.updated_at = now;
        Ok(Some(payment.clone()))
    }

    async fn settle_and_credit<T, F>(
        &self,
        external_reference: &str,
        now: DateTime<Utc>,
        credit: F,
    ) -> BoardResult<Option<(PaymentRecord, T)>>
    where
        F: FnOnce(&mut Account, &PaymentRecord) -> BoardResult<T> + Send,
        T: Send,
    {
        let mut payments = lock(&self.inner.payments);
        let Some(payment) = payments.iter_mut().find(|p| {
            p.external_reference == external_reference && p.status == PaymentStatus::Pending
        }) else {
            return Ok(None);
        };

        let slot = self
            .account_slot(&payment.account_id)
            .ok_or(BoardError::AccountNotFound)?;
        let mut account = lock(&slot);

        let mut settled = payment.clone();
        settled.status = PaymentStatus::Success;
        settled.updated_at = now;

        let mut draft = account.clone();
        let out = credit(&mut draft, &settled)?;
        *account = draft;
        *payment = settled.clone();

        Ok(Some((settled, out)))
    }

    async fn list_payments(&self, account_id: &AccountId) -> BoardResult<Vec<PaymentRecord>> {
        let payments = lock(&self.inner.payments);
        let mut list: Vec<PaymentRecord> = payments
            .iter()
            .filter(|p| p.account_id == *account_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }
}

// ============================================================================
// Notification Repository Implementation
// ============================================================================

impl NotificationRepository for MemoryBoardRepository {
    async fn push_notification(&self, notification: &Notification) -> BoardResult<()> {
        lock(&self.inner.notifications).push(notification.clone());
        Ok(())
    }

    async fn list_notifications(&self, account_id: &AccountId) -> BoardResult<Vec<Notification>> {
        let notifications = lock(&self.inner.notifications);
        // Insertion order is creation order; newest first
        Ok(notifications
            .iter()
            .rev()
            .filter(|n| n.account_id == *account_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        account_id: &AccountId,
        id: &NotificationId,
    ) -> BoardResult<bool> {
        let mut notifications = lock(&self.inner.notifications);
        match notifications
            .iter_mut()
            .find(|n| n.id == *id && n.account_id == *account_id)
        {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, account_id: &AccountId) -> BoardResult<u64> {
        let mut notifications = lock(&self.inner.notifications);
        let mut updated = 0;
        for n in notifications
            .iter_mut()
            .filter(|n| n.account_id == *account_id && !n.read)
        {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }
}

// ============================================================================
// Withdrawal Repository Implementation
// ============================================================================

impl WithdrawalRepository for MemoryBoardRepository {
    async fn create_withdrawal(&self, withdrawal: &Withdrawal) -> BoardResult<()> {
        lock(&self.inner.withdrawals).push(withdrawal.clone());
        Ok(())
    }

    async fn find_withdrawal(&self, id: &WithdrawalId) -> BoardResult<Option<Withdrawal>> {
        Ok(lock(&self.inner.withdrawals)
            .iter()
            .find(|w| w.id == *id)
            .cloned())
    }

    async fn list_pending_withdrawals(&self) -> BoardResult<Vec<Withdrawal>> {
        Ok(lock(&self.inner.withdrawals)
            .iter()
            .filter(|w| w.status == WithdrawalStatus::Pending)
            .cloned()
            .collect())
    }

    async fn approve_withdrawal(
        &self,
        id: &WithdrawalId,
        now: DateTime<Utc>,
    ) -> BoardResult<Withdrawal> {
        let mut withdrawals = lock(&self.inner.withdrawals);
        let withdrawal = withdrawals
            .iter_mut()
            .find(|w| w.id == *id)
            .ok_or(BoardError::WithdrawalNotFound)?;
        if withdrawal.status != WithdrawalStatus::Pending {
            return Err(BoardError::AlreadyDecided);
        }

        let slot = self
            .account_slot(&withdrawal.account_id)
            .ok_or(BoardError::AccountNotFound)?;
        let mut account = lock(&slot);

        let mut draft = account.clone();
        draft.debit(withdrawal.amount, now)?;
        withdrawal.decide(WithdrawalStatus::Approved, now)?;
        *account = draft;

        Ok(withdrawal.clone())
    }

    async fn reject_withdrawal(
        &self,
        id: &WithdrawalId,
        now: DateTime<Utc>,
    ) -> BoardResult<Withdrawal> {
        let mut withdrawals = lock(&self.inner.withdrawals);
        let withdrawal = withdrawals
            .iter_mut()
            .find(|w| w.id == *id)
            .ok_or(BoardError::WithdrawalNotFound)?;

        withdrawal.decide(WithdrawalStatus::Rejected, now)?;
        Ok(withdrawal.clone())
    }
}
