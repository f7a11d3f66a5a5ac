//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, NotificationId, PaymentId, WithdrawalId};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::entity::{
    account::{Account, AccountRole, JobApplication, PendingCode},
    notification::{Notification, NotificationKind},
    payment::{PaymentRecord, PaymentStatus},
    withdrawal::{Withdrawal, WithdrawalStatus},
};
use crate::domain::repository::{
    AccountRepository, NotificationRepository, PaymentRepository, WithdrawalRepository,
};
use crate::domain::value_object::{
    credential::CredentialHash, email::Email, phone::PhoneNumber,
};
use crate::error::{BoardError, BoardResult};

const ACCOUNT_COLUMNS: &str = r#"
    id,
    name,
    email,
    phone,
    password_hash,
    role,
    email_verified,
    admin_verified,
    payment_verified_until,
    email_code,
    email_code_expires_at,
    reset_code,
    reset_code_expires_at,
    connects,
    balance,
    session_version,
    created_at,
    updated_at
"#;

const PAYMENT_COLUMNS: &str = r#"
    id,
    account_id,
    amount,
    currency,
    phone,
    connects_grant,
    external_reference,
    status,
    created_at,
    updated_at
"#;

const WITHDRAWAL_COLUMNS: &str = r#"
    id,
    account_id,
    amount,
    method,
    address,
    status,
    created_at,
    decided_at
"#;

/// PostgreSQL-backed board repository
#[derive(Clone)]
pub struct PgBoardRepository {
    pool: PgPool,
}

impl PgBoardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Drop expired one-time codes so stale rows do not linger
    pub async fn purge_expired_codes(&self, now: DateTime<Utc>) -> BoardResult<u64> {
        let cleared = sqlx::query(
            r#"
            UPDATE accounts SET
                email_code = CASE WHEN email_code_expires_at <= $1 THEN NULL ELSE email_code END,
                email_code_expires_at = CASE WHEN email_code_expires_at <= $1 THEN NULL ELSE email_code_expires_at END,
                reset_code = CASE WHEN reset_code_expires_at <= $1 THEN NULL ELSE reset_code END,
                reset_code_expires_at = CASE WHEN reset_code_expires_at <= $1 THEN NULL ELSE reset_code_expires_at END
            WHERE email_code_expires_at <= $1 OR reset_code_expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        tracing::info!(accounts = cleared, "Purged expired verification codes");

        Ok(cleared)
    }
}

async fn fetch_applications<'e>(
    executor: impl PgExecutor<'e>,
    account_id: &AccountId,
) -> BoardResult<Vec<JobApplication>> {
    let rows = sqlx::query_as::<_, ApplicationRow>(
        r#"
        SELECT job_id, title, company, description, applied_at
        FROM job_applications
        WHERE account_id = $1
        ORDER BY applied_at, job_id
        "#,
    )
    .bind(account_id.as_uuid())
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(ApplicationRow::into_application).collect())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Load an account under a row lock held until the transaction ends
async fn lock_account(conn: &mut PgConnection, id: &AccountId) -> BoardResult<Option<Account>> {
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let applications = fetch_applications(&mut *conn, id).await?;
    row.into_account(applications).map(Some)
}

/// Persist a locked account; applications past `known_applications` are new
async fn write_account(
    conn: &mut PgConnection,
    account: &Account,
    known_applications: usize,
) -> BoardResult<()> {
    let (email_code, email_code_expires_at) = split_code(account.email_code.as_ref());
    let (reset_code, reset_code_expires_at) = split_code(account.reset_code.as_ref());

    sqlx::query(
        r#"
        UPDATE accounts SET
            name = $2,
            phone = $3,
            password_hash = $4,
            role = $5,
            email_verified = $6,
            admin_verified = $7,
            payment_verified_until = $8,
            email_code = $9,
            email_code_expires_at = $10,
            reset_code = $11,
            reset_code_expires_at = $12,
            connects = $13,
            balance = $14,
            session_version = $15,
            updated_at = $16
        WHERE id = $1
        "#,
    )
    .bind(account.id.as_uuid())
    .bind(&account.name)
    .bind(account.phone.as_ref().map(|p| p.as_str()))
    .bind(account.credential.as_phc_string())
    .bind(account.role.as_str())
    .bind(account.email_verified)
    .bind(account.admin_verified)
    .bind(account.payment_verified_until)
    .bind(email_code)
    .bind(email_code_expires_at)
    .bind(reset_code)
    .bind(reset_code_expires_at)
    .bind(i64::from(account.connects))
    .bind(account.balance)
    .bind(i64::from(account.session_version))
    .bind(account.updated_at)
    .execute(&mut *conn)
    .await?;

    // Applications are append-only
    for application in account.applications.iter().skip(known_applications) {
        sqlx::query(
            r#"
            INSERT INTO job_applications (
                account_id,
                job_id,
                title,
                company,
                description,
                applied_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&application.job_id)
        .bind(&application.title)
        .bind(&application.company)
        .bind(&application.description)
        .bind(application.applied_at)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for PgBoardRepository {
    async fn create_account(&self, account: &Account) -> BoardResult<()> {
        let (email_code, email_code_expires_at) = split_code(account.email_code.as_ref());
        let (reset_code, reset_code_expires_at) = split_code(account.reset_code.as_ref());

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id,
                name,
                email,
                phone,
                password_hash,
                role,
                email_verified,
                admin_verified,
                payment_verified_until,
                email_code,
                email_code_expires_at,
                reset_code,
                reset_code_expires_at,
                connects,
                balance,
                session_version,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.name)
        .bind(account.email.as_str())
        .bind(account.phone.as_ref().map(|p| p.as_str()))
        .bind(account.credential.as_phc_string())
        .bind(account.role.as_str())
        .bind(account.email_verified)
        .bind(account.admin_verified)
        .bind(account.payment_verified_until)
        .bind(email_code)
        .bind(email_code_expires_at)
        .bind(reset_code)
        .bind(reset_code_expires_at)
        .bind(i64::from(account.connects))
        .bind(account.balance)
        .bind(i64::from(account.session_version))
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BoardError::EmailTaken
            } else {
                BoardError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn find_account(&self, id: &AccountId) -> BoardResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let applications = fetch_applications(&self.pool, id).await?;
        row.into_account(applications).map(Some)
    }

    async fn find_account_by_email(&self, email: &Email) -> BoardResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let applications = fetch_applications(&self.pool, &AccountId::from_uuid(row.id)).await?;
        row.into_account(applications).map(Some)
    }

    async fn modify_account<T, F>(&self, id: &AccountId, f: F) -> BoardResult<T>
    where
        F: FnOnce(&mut Account) -> BoardResult<T> + Send,
        T: Send,
    {
        let mut tx = self.pool.begin().await?;

        let mut account = lock_account(&mut tx, id)
            .await?
            .ok_or(BoardError::AccountNotFound)?;
        let known_applications = account.applications.len();

        // Dropping `tx` on error rolls back
        let out = f(&mut account)?;

        write_account(&mut tx, &account, known_applications).await?;
        tx.commit().await?;

        Ok(out)
    }
}

// ============================================================================
// Payment Repository Implementation
// ============================================================================

impl PaymentRepository for PgBoardRepository {
    async fn create_payment(&self, payment: &PaymentRecord) -> BoardResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id,
                account_id,
                amount,
                currency,
                phone,
                connects_grant,
                external_reference,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.account_id.as_uuid())
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.phone.as_str())
        .bind(i64::from(payment.connects_grant))
        .bind(&payment.external_reference)
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_payment_by_reference(
        &self,
        external_reference: &str,
    ) -> BoardResult<Option<PaymentRecord>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE external_reference = $1"
        ))
        .bind(external_reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_payment()).transpose()
    }

    async fn settle_payment(
        &self,
        external_reference: &str,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> BoardResult<Option<PaymentRecord>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            UPDATE payments SET
                status = $2,
                updated_at = $3
            WHERE external_reference = $1 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(external_reference)
        .bind(status.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_payment()).transpose()
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
        let mut tx = self.pool.begin().await?;

        // Payment row first, then the account, so concurrent deliveries queue here
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE external_reference = $1 AND status = 'pending'
            FOR UPDATE
            "#
        ))
        .bind(external_reference)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut payment = row.into_payment()?;
        payment.status = PaymentStatus::Success;
        payment.updated_at = now;

        let mut account = lock_account(&mut tx, &payment.account_id)
            .await?
            .ok_or(BoardError::AccountNotFound)?;
        let known_applications = account.applications.len();

        // Dropping `tx` on error leaves the payment pending
        let out = credit(&mut account, &payment)?;

        write_account(&mut tx, &account, known_applications).await?;
        sqlx::query("UPDATE payments SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(payment.id.as_uuid())
            .bind(payment.status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some((payment, out)))
    }

    async fn list_payments(&self, account_id: &AccountId) -> BoardResult<Vec<PaymentRecord>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE account_id = $1 ORDER BY created_at DESC"
        ))
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }
}

// ============================================================================
// Notification Repository Implementation
// ============================================================================

impl NotificationRepository for PgBoardRepository {
    async fn push_notification(&self, notification: &Notification) -> BoardResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id,
                account_id,
                title,
                message,
                kind,
                read,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.account_id.as_uuid())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_notifications(&self, account_id: &AccountId) -> BoardResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, account_id, title, message, kind, read, created_at
            FROM notifications
            WHERE account_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NotificationRow::into_notification).collect()
    }

    async fn mark_notification_read(
        &self,
        account_id: &AccountId,
        id: &NotificationId,
    ) -> BoardResult<bool> {
        let updated = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE id = $1 AND account_id = $2",
        )
        .bind(id.as_uuid())
        .bind(account_id.as_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    async fn mark_all_notifications_read(&self, account_id: &AccountId) -> BoardResult<u64> {
        let updated = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE account_id = $1 AND read = FALSE",
        )
        .bind(account_id.as_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated)
    }
}

// ============================================================================
// Withdrawal Repository Implementation
// ============================================================================

impl WithdrawalRepository for PgBoardRepository {
    async fn create_withdrawal(&self, withdrawal: &Withdrawal) -> BoardResult<()> {
        sqlx::query(
            r#"
            INSERT INTO withdrawals (
                id,
                account_id,
                amount,
                method,
                address,
                status,
                created_at,
                decided_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(withdrawal.id.as_uuid())
        .bind(withdrawal.account_id.as_uuid())
        .bind(withdrawal.amount)
        .bind(&withdrawal.method)
        .bind(&withdrawal.address)
        .bind(withdrawal.status.as_str())
        .bind(withdrawal.created_at)
        .bind(withdrawal.decided_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_withdrawal(&self, id: &WithdrawalId) -> BoardResult<Option<Withdrawal>> {
        let row = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_withdrawal()).transpose()
    }

    async fn list_pending_withdrawals(&self) -> BoardResult<Vec<Withdrawal>> {
        let rows = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals WHERE status = 'pending' ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WithdrawalRow::into_withdrawal).collect()
    }

    async fn approve_withdrawal(
        &self,
        id: &WithdrawalId,
        now: DateTime<Utc>,
    ) -> BoardResult<Withdrawal> {
        let mut tx = self.pool.begin().await?;

        let mut withdrawal = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BoardError::WithdrawalNotFound)?
        .into_withdrawal()?;

        withdrawal.decide(WithdrawalStatus::Approved, now)?;

        let debited = sqlx::query(
            r#"
            UPDATE accounts SET
                balance = balance - $2,
                updated_at = $3
            WHERE id = $1 AND balance >= $2
            "#,
        )
        .bind(withdrawal.account_id.as_uuid())
        .bind(withdrawal.amount)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if debited == 0 {
            return Err(BoardError::InsufficientBalance);
        }

        sqlx::query("UPDATE withdrawals SET status = $2, decided_at = $3 WHERE id = $1")
            .bind(withdrawal.id.as_uuid())
            .bind(withdrawal.status.as_str())
            .bind(withdrawal.decided_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(withdrawal)
    }

    async fn reject_withdrawal(
        &self,
        id: &WithdrawalId,
        now: DateTime<Utc>,
    ) -> BoardResult<Withdrawal> {
        let row = sqlx::query_as::<_, WithdrawalRow>(&format!(
            r#"
            UPDATE withdrawals SET
                status = 'rejected',
                decided_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING {WITHDRAWAL_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_withdrawal(),
            None => match self.find_withdrawal(id).await? {
                Some(_) => Err(BoardError::AlreadyDecided),
                None => Err(BoardError::WithdrawalNotFound),
            },
        }
    }
}

// ============================================================================
// Row Types
// ============================================================================

fn split_code(code: Option<&PendingCode>) -> (Option<&str>, Option<DateTime<Utc>>) {
    match code {
        Some(c) => (Some(c.code.as_str()), Some(c.expires_at)),
        None => (None, None),
    }
}

fn join_code(code: Option<String>, expires_at: Option<DateTime<Utc>>) -> Option<PendingCode> {
    match (code, expires_at) {
        (Some(code), Some(expires_at)) => Some(PendingCode { code, expires_at }),
        _ => None,
    }
}

fn to_u32(value: i64, column: &str) -> BoardResult<u32> {
    u32::try_from(value).map_err(|_| BoardError::Internal(format!("Invalid {column}: {value}")))
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    role: String,
    email_verified: bool,
    admin_verified: bool,
    payment_verified_until: Option<DateTime<Utc>>,
    email_code: Option<String>,
    email_code_expires_at: Option<DateTime<Utc>>,
    reset_code: Option<String>,
    reset_code_expires_at: Option<DateTime<Utc>>,
    connects: i64,
    balance: i64,
    session_version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self, applications: Vec<JobApplication>) -> BoardResult<Account> {
        let credential = CredentialHash::from_phc_string(self.password_hash)
            .map_err(|e| BoardError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Account {
            id: AccountId::from_uuid(self.id),
            name: self.name,
            email: Email::from_db(self.email),
            phone: self.phone.map(PhoneNumber::from_db),
            credential,
            role: AccountRole::from_db(&self.role)?,
            email_verified: self.email_verified,
            admin_verified: self.admin_verified,
            payment_verified_until: self.payment_verified_until,
            email_code: join_code(self.email_code, self.email_code_expires_at),
            reset_code: join_code(self.reset_code, self.reset_code_expires_at),
            connects: to_u32(self.connects, "connects")?,
            applications,
            balance: self.balance,
            session_version: to_u32(self.session_version, "session_version")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    job_id: String,
    title: String,
    company: String,
    description: String,
    applied_at: DateTime<Utc>,
}

impl ApplicationRow {
    fn into_application(self) -> JobApplication {
        JobApplication {
            job_id: self.job_id,
            title: self.title,
            company: self.company,
            description: self.description,
            applied_at: self.applied_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    account_id: Uuid,
    amount: i64,
    currency: String,
    phone: String,
    connects_grant: i64,
    external_reference: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> BoardResult<PaymentRecord> {
        Ok(PaymentRecord {
            id: PaymentId::from_uuid(self.id),
            account_id: AccountId::from_uuid(self.account_id),
            amount: self.amount,
            currency: self.currency,
            phone: PhoneNumber::from_db(self.phone),
            connects_grant: to_u32(self.connects_grant, "connects_grant")?,
            external_reference: self.external_reference,
            status: PaymentStatus::from_db(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    account_id: Uuid,
    title: String,
    message: String,
    kind: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> BoardResult<Notification> {
        Ok(Notification {
            id: NotificationId::from_uuid(self.id),
            account_id: AccountId::from_uuid(self.account_id),
            title: self.title,
            message: self.message,
            kind: NotificationKind::from_db(&self.kind)?,
            read: self.read,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WithdrawalRow {
    id: Uuid,
    account_id: Uuid,
    amount: i64,
    method: String,
    address: String,
    status: String,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

impl WithdrawalRow {
    fn into_withdrawal(self) -> BoardResult<Withdrawal> {
        Ok(Withdrawal {
            id: WithdrawalId::from_uuid(self.id),
            account_id: AccountId::from_uuid(self.account_id),
            amount: self.amount,
            method: self.method,
            address: self.address,
            status: WithdrawalStatus::from_db(&self.status)?,
            created_at: self.created_at,
            decided_at: self.decided_at,
        })
    }
}
