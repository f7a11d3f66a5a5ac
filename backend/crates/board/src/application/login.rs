//! Login Use Case
//!
//! Exchanges email + password for a bearer token.

use std::sync::Arc;

use kernel::clock::Clock;
use kernel::id::AccountId;

use crate::application::config::BoardConfig;
use crate::application::session::issue_token;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::{credential::RawPassword, email::Email};
use crate::error::{BoardError, BoardResult};

/// Login input
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Login output
pub struct LoginOutput {
    pub account_id: AccountId,
    pub token: String,
    pub expires_at_ms: i64,
    pub email_verified: bool,
}

/// Login use case
pub struct LoginUseCase<A>
where
    A: AccountRepository,
{
    accounts: Arc<A>,
    config: Arc<BoardConfig>,
    clock: Arc<dyn Clock>,
}

impl<A> LoginUseCase<A>
where
    A: AccountRepository,
{
    pub fn new(accounts: Arc<A>, config: Arc<BoardConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts,
            config,
            clock,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> BoardResult<LoginOutput> {
        // Unknown and malformed emails look the same as a wrong password
        let email = Email::new(input.email).map_err(|_| BoardError::InvalidCredentials)?;
        let account = self
            .accounts
            .find_account_by_email(&email)
            .await?
            .ok_or(BoardError::InvalidCredentials)?;

        let password = RawPassword::for_login(input.password);
        if !account.credential.verify(&password, self.config.pepper()) {
            return Err(BoardError::InvalidCredentials);
        }

        let issued = issue_token(
            &self.config,
            &account.id,
            account.session_version,
            self.clock.now(),
        );

        tracing::info!(account_id = %account.id, "Account logged in");

        Ok(LoginOutput {
            account_id: account.id,
            token: issued.token,
            expires_at_ms: issued.expires_at_ms,
            email_verified: account.email_verified,
        })
    }
}
