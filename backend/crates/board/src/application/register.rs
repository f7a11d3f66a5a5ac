//! Register Use Case
//!
//! Creates an unverified account holding the free connects allowance.

use std::sync::Arc;

use kernel::clock::Clock;
use kernel::id::AccountId;

use crate::application::config::BoardConfig;
use crate::domain::entity::account::Account;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::{
    credential::{CredentialHash, RawPassword},
    email::Email,
    phone::PhoneNumber,
};
use crate::error::{BoardError, BoardResult};

const NAME_MAX_LENGTH: usize = 100;

/// Register input
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Register output
pub struct RegisterOutput {
    pub account_id: AccountId,
    pub email: Email,
    pub connects: u32,
}

/// Register use case
pub struct RegisterUseCase<A>
where
    A: AccountRepository,
{
    accounts: Arc<A>,
    config: Arc<BoardConfig>,
    clock: Arc<dyn Clock>,
}

impl<A> RegisterUseCase<A>
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

    pub async fn execute(&self, input: RegisterInput) -> BoardResult<RegisterOutput> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(BoardError::Validation("Name is required".into()));
        }
        if name.chars().count() > NAME_MAX_LENGTH {
            return Err(BoardError::Validation(format!(
                "Name must be at most {} characters",
                NAME_MAX_LENGTH
            )));
        }

        let email = Email::new(input.email)?;
        let phone = input
            .phone
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                PhoneNumber::normalize(
                    &p,
                    &self.config.phone_country_code,
                    self.config.phone_subscriber_digits,
                )
            })
            .transpose()?;

        if self.accounts.find_account_by_email(&email).await?.is_some() {
            return Err(BoardError::EmailTaken);
        }

        let raw_password = RawPassword::new(input.password)?;
        let credential = CredentialHash::from_raw(&raw_password, self.config.pepper())?;

        let account = Account::new(
            name,
            email,
            phone,
            credential,
            self.config.free_connects,
            self.clock.now(),
        );

        // A concurrent registration can still win the unique index
        self.accounts.create_account(&account).await?;

        tracing::info!(
            account_id = %account.id,
            email_domain = %account.email.domain(),
            connects = account.connects,
            "Account registered"
        );

        Ok(RegisterOutput {
            account_id: account.id,
            email: account.email,
            connects: account.connects,
        })
    }
}
