//! Get Account Use Case

use std::sync::Arc;

use kernel::id::AccountId;

use crate::domain::entity::account::{Account, JobApplication};
use crate::domain::repository::AccountRepository;
use crate::error::{BoardError, BoardResult};

pub struct GetAccountUseCase<A>
where
    A: AccountRepository,
{
    accounts: Arc<A>,
}

impl<A> GetAccountUseCase<A>
where
    A: AccountRepository,
{
    pub fn new(accounts: Arc<A>) -> Self {
        Self { accounts }
    }

    pub async fn execute(&self, id: &AccountId) -> BoardResult<Account> {
        self.accounts
            .find_account(id)
            .await?
            .ok_or(BoardError::AccountNotFound)
    }

    /// Application history, oldest first
    pub async fn applications(&self, id: &AccountId) -> BoardResult<Vec<JobApplication>> {
        Ok(self.execute(id).await?.applications)
    }
}
