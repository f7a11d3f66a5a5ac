//! Apply Job Use Case
//!
//! Spends a connect on a job application. The duplicate check, the
//! eligibility check, the decrement and the append all happen inside one
//! `modify_account` call, so two racing applies can never both spend the
//! last connect.

use std::sync::Arc;

use kernel::clock::Clock;
use kernel::id::AccountId;

use crate::application::config::BoardConfig;
use crate::application::notifications::Notifier;
use crate::domain::entity::account::{ApplyOutcome, JobMeta};
use crate::domain::entity::notification::NotificationKind;
use crate::domain::repository::{AccountRepository, NotificationRepository};
use crate::error::{BoardError, BoardResult};

/// Apply input
pub struct ApplyInput {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub description: Option<String>,
}

/// Apply job use case
pub struct ApplyJobUseCase<A, N>
where
    A: AccountRepository,
    N: NotificationRepository,
{
    accounts: Arc<A>,
    notifier: Notifier<N>,
    config: Arc<BoardConfig>,
    clock: Arc<dyn Clock>,
}

impl<A, N> ApplyJobUseCase<A, N>
where
    A: AccountRepository,
    N: NotificationRepository,
{
    pub fn new(
        accounts: Arc<A>,
        notifications: Arc<N>,
        config: Arc<BoardConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            notifier: Notifier::new(notifications, clock.clone()),
            config,
            clock,
        }
    }

    pub async fn execute(&self, account_id: &AccountId, input: ApplyInput) -> BoardResult<ApplyOutcome> {
        let job_id = required("jobId", &input.job_id)?;
        let title = required("title", &input.title)?;
        let company = required("company", &input.company)?;
        let meta = JobMeta {
            title: title.clone(),
            company: company.clone(),
            description: input.description.unwrap_or_default().trim().to_string(),
        };

        let now = self.clock.now();
        let policy = self.config.unlimited_policy;
        let result = self
            .accounts
            .modify_account(account_id, |a| {
                let unlimited = a.is_unlimited(policy, now);
                a.apply(&job_id, meta, unlimited, now)
            })
            .await;

        match &result {
            Ok(ApplyOutcome::Applied { connects }) => {
                tracing::info!(
                    account_id = %account_id,
                    job_id = %job_id,
                    connects,
                    "Applied to job"
                );
                self.notifier
                    .emit(
                        account_id,
                        "Application Submitted",
                        format!("You successfully applied for \"{title}\" at {company}."),
                        NotificationKind::Success,
                    )
                    .await;
            }
            Ok(ApplyOutcome::AlreadyApplied { .. }) => {
                tracing::debug!(account_id = %account_id, job_id = %job_id, "Already applied");
                self.notifier
                    .emit(
                        account_id,
                        "Already Applied",
                        format!("You already applied for \"{title}\" at {company}."),
                        NotificationKind::Info,
                    )
                    .await;
            }
            Err(BoardError::QuotaExceeded) => {
                tracing::info!(account_id = %account_id, job_id = %job_id, "Apply refused, no connects");
                self.notifier
                    .emit(
                        account_id,
                        "No Connects Remaining",
                        "You don't have enough connects to apply for this job.",
                        NotificationKind::Warning,
                    )
                    .await;
            }
            Err(_) => {}
        }

        result
    }
}

fn required(field: &str, value: &str) -> BoardResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BoardError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
