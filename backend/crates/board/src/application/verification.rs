//! Verification Use Case
//!
//! Issues and consumes emailed one-time codes for email verification and
//! password reset.
//!
//! Issuing sends first and persists second: a code that was never stored
//! but reached the inbox would lock the user out, while a stored code that
//! never arrived is simply replaced by the next request. The email call is
//! made with no account lock held; the store is updated afterwards in one
//! atomic step.

use std::sync::Arc;

use kernel::clock::Clock;
use kernel::id::AccountId;
use platform::crypto::random_numeric_code;

use crate::application::config::BoardConfig;
use crate::domain::entity::account::{CodePurpose, PendingCode};
use crate::domain::gateway::EmailSender;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::{
    credential::{CredentialHash, RawPassword},
    email::Email,
};
use crate::error::{BoardError, BoardResult};

/// Verification use case
pub struct VerificationUseCase<A, E>
where
    A: AccountRepository,
    E: EmailSender,
{
    accounts: Arc<A>,
    mailer: Arc<E>,
    config: Arc<BoardConfig>,
    clock: Arc<dyn Clock>,
}

impl<A, E> VerificationUseCase<A, E>
where
    A: AccountRepository,
    E: EmailSender,
{
    pub fn new(
        accounts: Arc<A>,
        mailer: Arc<E>,
        config: Arc<BoardConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            mailer,
            config,
            clock,
        }
    }

    /// Generate, email, then store a code, replacing any earlier one of the
    /// same purpose. Returns the code.
    pub async fn issue_code(&self, account_id: &AccountId, purpose: CodePurpose) -> BoardResult<String> {
        let account = self
            .accounts
            .find_account(account_id)
            .await?
            .ok_or(BoardError::AccountNotFound)?;

        let code = random_numeric_code(self.config.code_digits);
        let (subject, html) = render_code_email(&self.config, purpose, &account.name, &code);

        let sent = tokio::time::timeout(
            self.config.outbound_timeout,
            self.mailer.send(&account.email, &subject, &html),
        )
        .await
        .map_err(|_| BoardError::Gateway("Email provider timed out".into()))?;
        sent?;

        let now = self.clock.now();
        let pending = PendingCode {
            code: code.clone(),
            expires_at: now + self.config.code_ttl(),
        };
        self.accounts
            .modify_account(account_id, |a| {
                a.set_pending_code(purpose, pending, now);
                Ok(())
            })
            .await?;

        tracing::info!(
            account_id = %account_id,
            purpose = purpose.as_str(),
            "Verification code issued"
        );

        Ok(code)
    }

    /// Issue by email address (resend, forgot password)
    pub async fn issue_code_for_email(&self, email: &str, purpose: CodePurpose) -> BoardResult<String> {
        let account_id = self.resolve(email).await?;
        self.issue_code(&account_id, purpose).await
    }

    /// Check and clear a code, applying its effect
    pub async fn consume_code(
        &self,
        account_id: &AccountId,
        purpose: CodePurpose,
        code: &str,
    ) -> BoardResult<()> {
        let now = self.clock.now();
        let result = self
            .accounts
            .modify_account(account_id, |a| a.consume_code(purpose, code, now))
            .await;

        match &result {
            Ok(()) => tracing::info!(
                account_id = %account_id,
                purpose = purpose.as_str(),
                "Verification code consumed"
            ),
            Err(BoardError::InvalidCode | BoardError::CodeExpired) => tracing::warn!(
                account_id = %account_id,
                purpose = purpose.as_str(),
                "Verification code rejected"
            ),
            Err(_) => {}
        }

        result
    }

    pub async fn verify_email(&self, account_id: &AccountId, code: &str) -> BoardResult<()> {
        self.consume_code(account_id, CodePurpose::EmailVerify, code)
            .await
    }

    /// Consume a reset code and replace the credential in one atomic update
    ///
    /// The new password is validated and hashed before the account is
    /// locked; a bad code then leaves the stored credential untouched.
    pub async fn reset_password(
        &self,
        account_id: &AccountId,
        code: &str,
        new_password: String,
    ) -> BoardResult<()> {
        let raw = RawPassword::new(new_password)?;
        let credential = CredentialHash::from_raw(&raw, self.config.pepper())?;

        let now = self.clock.now();
        let verifies_email = self.config.reset_verifies_email;
        self.accounts
            .modify_account(account_id, |a| {
                a.reset_password(code, credential, verifies_email, now)
            })
            .await?;

        tracing::info!(account_id = %account_id, "Password reset");
        Ok(())
    }

    pub async fn reset_password_for_email(
        &self,
        email: &str,
        code: &str,
        new_password: String,
    ) -> BoardResult<()> {
        let account_id = self.resolve(email).await?;
        self.reset_password(&account_id, code, new_password).await
    }

    async fn resolve(&self, email: &str) -> BoardResult<AccountId> {
        let email = Email::new(email)?;
        self.accounts
            .find_account_by_email(&email)
            .await?
            .map(|a| a.id)
            .ok_or(BoardError::AccountNotFound)
    }
}

fn render_code_email(
    config: &BoardConfig,
    purpose: CodePurpose,
    name: &str,
    code: &str,
) -> (String, String) {
    let minutes = config.code_ttl.as_secs() / 60;
    let (subject, intro) = match purpose {
        CodePurpose::EmailVerify => (
            format!("{} - Verify your email", config.site_name),
            "Use this code to verify your email address:",
        ),
        CodePurpose::PasswordReset => (
            format!("{} - Password reset code", config.site_name),
            "Use this code to reset your password:",
        ),
    };
    let html = format!(
        "<p>Hello {name},</p><p>{intro}</p><h2>{code}</h2>\
         <p>The code expires in {minutes} minutes. If you did not request it, ignore this email.</p>",
        name = escape_html(name),
    );
    (subject, html)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
