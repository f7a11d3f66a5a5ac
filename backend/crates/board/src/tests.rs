//! Use-case scenarios for the board crate
//!
//! Run against the in-memory store, a capturing mailer, a scripted payment
//! gateway and a manual clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use chrono::{Duration, Utc};
use kernel::clock::{Clock, ManualClock};
use kernel::id::AccountId;

use crate::application::{
    AdminUseCase, ApplyInput, ApplyJobUseCase, BoardConfig, CallbackOutcome, CallbackPayload,
    LoginInput, LoginUseCase, NotificationsUseCase, PaymentUseCase, RegisterInput,
    RegisterUseCase, UnlimitedPolicy, VerificationUseCase, WalletUseCase, WithdrawalInput,
};
use crate::domain::entity::account::{Account, ApplyOutcome, CodePurpose, Verification};
use crate::domain::entity::notification::NotificationKind;
use crate::domain::entity::payment::{PaymentRecord, PaymentStatus};
use crate::domain::entity::withdrawal::WithdrawalStatus;
use crate::domain::gateway::{EmailSender, PaymentGateway};
use crate::domain::repository::{AccountRepository, PaymentRepository};
use crate::domain::value_object::{
    credential::{CredentialHash, RawPassword},
    email::Email,
    phone::PhoneNumber,
};
use crate::error::{BoardError, BoardResult};
use crate::infra::memory::MemoryBoardRepository;
use platform::crypto::{hmac_sha256, to_base64_url};

const PASSWORD: &str = "Nairobi#Remote2025";

// ============================================================================
// Fakes
// ============================================================================

#[derive(Clone, Default)]
struct FakeMailer {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail: Arc<AtomicBool>,
}

impl FakeMailer {
    fn fail_next_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Code from the most recent email to `to`
    fn last_code_for(&self, to: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let (_, html) = sent.iter().rev().find(|(addr, _)| addr == to)?;
        let start = html.find("<h2>")? + 4;
        let end = html[start..].find("</h2>")? + start;
        Some(html[start..end].to_string())
    }
}

impl EmailSender for FakeMailer {
    async fn send(&self, to: &Email, _subject: &str, html: &str) -> BoardResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BoardError::Gateway("smtp down".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.as_str().to_string(), html.to_string()));
        Ok(())
    }
}

/// One STK push as the gateway saw it
#[derive(Debug, Clone, PartialEq, Eq)]
struct Push {
    amount: i64,
    phone: String,
    reference: String,
    callback_url: String,
}

impl Push {
    fn signature(&self) -> String {
        let (_, sig) = self.callback_url.split_once("sig=").unwrap();
        sig.to_string()
    }
}

#[derive(Clone, Default)]
struct FakeGateway {
    pushes: Arc<Mutex<Vec<Push>>>,
    fail: Arc<AtomicBool>,
}

impl FakeGateway {
    fn last_push(&self) -> Option<Push> {
        self.pushes.lock().unwrap().last().cloned()
    }
}

impl PaymentGateway for FakeGateway {
    async fn initiate_payment(
        &self,
        amount: i64,
        phone: &PhoneNumber,
        external_reference: &str,
        callback_url: &str,
    ) -> BoardResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BoardError::Gateway("gateway rejected".into()));
        }
        self.pushes.lock().unwrap().push(Push {
            amount,
            phone: phone.as_str().to_string(),
            reference: external_reference.to_string(),
            callback_url: callback_url.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

type Store = MemoryBoardRepository;

struct Harness {
    store: Arc<Store>,
    mailer: Arc<FakeMailer>,
    gateway: Arc<FakeGateway>,
    config: Arc<BoardConfig>,
    clock: Arc<ManualClock>,
}

/// Argon2 is slow in debug builds; hash the shared test password once
fn test_credential() -> CredentialHash {
    static CREDENTIAL: OnceLock<CredentialHash> = OnceLock::new();
    CREDENTIAL
        .get_or_init(|| {
            CredentialHash::from_raw(&RawPassword::for_login(PASSWORD.to_string()), None).unwrap()
        })
        .clone()
}

impl Harness {
    fn new() -> Self {
        Self::with_config(BoardConfig::with_random_secret())
    }

    fn with_config(config: BoardConfig) -> Self {
        Self {
            store: Arc::new(Store::new()),
            mailer: Arc::new(FakeMailer::default()),
            gateway: Arc::new(FakeGateway::default()),
            config: Arc::new(config),
            clock: Arc::new(ManualClock::new(Utc::now())),
        }
    }

    fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    async fn seed(&self, email: &str, connects: u32) -> AccountId {
        let account = Account::new(
            "Jane Wanjiku".to_string(),
            Email::new(email).unwrap(),
            None,
            test_credential(),
            connects,
            self.clock.now(),
        );
        self.store.create_account(&account).await.unwrap();
        account.id
    }

    async fn account(&self, id: &AccountId) -> Account {
        self.store.find_account(id).await.unwrap().unwrap()
    }

    fn apply_uc(&self) -> ApplyJobUseCase<Store, Store> {
        ApplyJobUseCase::new(
            self.store.clone(),
            self.store.clone(),
            self.config.clone(),
            self.clock(),
        )
    }

    fn verification_uc(&self) -> VerificationUseCase<Store, FakeMailer> {
        VerificationUseCase::new(
            self.store.clone(),
            self.mailer.clone(),
            self.config.clone(),
            self.clock(),
        )
    }

    fn payment_uc(&self) -> PaymentUseCase<Store, Store, Store, FakeGateway> {
        PaymentUseCase::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.gateway.clone(),
            self.config.clone(),
            self.clock(),
        )
    }

    fn admin_uc(&self) -> AdminUseCase<Store, Store> {
        AdminUseCase::new(self.store.clone(), self.store.clone(), self.clock())
    }

    fn wallet_uc(&self) -> WalletUseCase<Store, Store, Store> {
        WalletUseCase::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.config.clone(),
            self.clock(),
        )
    }

    fn notifications_uc(&self) -> NotificationsUseCase<Store> {
        NotificationsUseCase::new(self.store.clone())
    }

    async fn apply(&self, id: &AccountId, job_id: &str) -> BoardResult<ApplyOutcome> {
        self.apply_uc().execute(id, job(job_id)).await
    }

    async fn titles(&self, id: &AccountId) -> Vec<String> {
        self.notifications_uc()
            .list(id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect()
    }

    /// Initiate a payment and return its external reference
    async fn initiate(&self, id: &AccountId) -> String {
        self.payment_uc()
            .initiate(id, "0712345678", None)
            .await
            .unwrap()
            .external_reference
    }

    /// Delivery signed the way the gateway's callback URL is
    fn signed(&self, reference: &str, status: &str) -> CallbackPayload {
        let signature = hmac_sha256(&self.config.callback_secret, reference.as_bytes());
        CallbackPayload {
            external_reference: reference.to_string(),
            status: status.to_string(),
            signature: Some(to_base64_url(&signature)),
        }
    }

    async fn callback(&self, reference: &str, status: &str) -> CallbackOutcome {
        self.payment_uc()
            .on_callback(self.signed(reference, status))
            .await
    }

    async fn set_balance(&self, id: &AccountId, balance: i64) {
        self.store
            .modify_account(id, |a| {
                a.balance = balance;
                Ok(())
            })
            .await
            .unwrap();
    }
}

fn job(job_id: &str) -> ApplyInput {
    ApplyInput {
        job_id: job_id.to_string(),
        title: "Rust Engineer".to_string(),
        company: "Acme Remote".to_string(),
        description: Some("Backend services".to_string()),
    }
}

// ============================================================================
// Registration / Login
// ============================================================================

#[cfg(test)]
mod account_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_grants_free_connects() {
        let h = Harness::new();
        let output = RegisterUseCase::new(h.store.clone(), h.config.clone(), h.clock())
            .execute(RegisterInput {
                name: "  Jane Wanjiku ".to_string(),
                email: "Jane@Example.com".to_string(),
                password: PASSWORD.to_string(),
                phone: Some("0712 345 678".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(output.connects, 3);
        assert_eq!(output.email.as_str(), "jane@example.com");

        let account = h.account(&output.account_id).await;
        assert_eq!(account.name, "Jane Wanjiku");
        assert_eq!(account.phone.as_ref().unwrap().as_str(), "254712345678");
        assert!(!account.email_verified);
        assert_eq!(account.verification(h.clock.now()), Verification::Unverified);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let h = Harness::new();
        h.seed("jane@example.com", 3).await;

        let result = RegisterUseCase::new(h.store.clone(), h.config.clone(), h.clock())
            .execute(RegisterInput {
                name: "Jane".to_string(),
                email: "JANE@example.com".to_string(),
                password: PASSWORD.to_string(),
                phone: None,
            })
            .await;

        assert!(matches!(result, Err(BoardError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let h = Harness::new();
        let register = RegisterUseCase::new(h.store.clone(), h.config.clone(), h.clock());

        let weak = register
            .execute(RegisterInput {
                name: "Jane".to_string(),
                email: "jane@example.com".to_string(),
                password: "password123".to_string(),
                phone: None,
            })
            .await;
        assert!(matches!(weak, Err(BoardError::Validation(_))));

        let bad_phone = register
            .execute(RegisterInput {
                name: "Jane".to_string(),
                email: "jane@example.com".to_string(),
                password: PASSWORD.to_string(),
                phone: Some("12345".to_string()),
            })
            .await;
        assert!(matches!(bad_phone, Err(BoardError::InvalidPhone)));

        let no_name = register
            .execute(RegisterInput {
                name: "   ".to_string(),
                email: "jane@example.com".to_string(),
                password: PASSWORD.to_string(),
                phone: None,
            })
            .await;
        assert!(matches!(no_name, Err(BoardError::Validation(_))));
    }

    #[tokio::test]
    async fn test_login() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let login = LoginUseCase::new(h.store.clone(), h.config.clone(), h.clock());

        let output = login
            .execute(LoginInput {
                email: "JANE@example.com".to_string(),
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(output.account_id, id);
        assert_eq!(
            crate::application::session::verify_token(&h.config, &output.token, h.clock.now())
                .unwrap()
                .account_id,
            id
        );

        for (email, password) in [
            ("jane@example.com", "Nairobi#Remote2026"),
            ("nobody@example.com", PASSWORD),
            ("not-an-email", PASSWORD),
        ] {
            let result = login
                .execute(LoginInput {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await;
            assert!(matches!(result, Err(BoardError::InvalidCredentials)));
        }
    }
}

// ============================================================================
// Quota Ledger
// ============================================================================

#[cfg(test)]
mod quota_tests {
    use super::*;

    #[tokio::test]
    async fn test_free_connects_then_quota_exceeded() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;

        for (i, job_id) in ["job-1", "job-2", "job-3"].iter().enumerate() {
            let outcome = h.apply(&id, job_id).await.unwrap();
            assert_eq!(outcome, ApplyOutcome::Applied { connects: 2 - i as u32 });
        }

        let result = h.apply(&id, "job-4").await;
        assert!(matches!(result, Err(BoardError::QuotaExceeded)));

        let account = h.account(&id).await;
        assert_eq!(account.connects, 0);
        assert_eq!(account.applications.len(), 3);
        assert!(!account.has_applied("job-4"));

        let titles = h.titles(&id).await;
        assert_eq!(titles[0], "No Connects Remaining");
        assert_eq!(
            titles.iter().filter(|t| *t == "Application Submitted").count(),
            3
        );
    }

    #[tokio::test]
    async fn test_duplicate_job_charged_once() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;

        assert_eq!(
            h.apply(&id, "job-1").await.unwrap(),
            ApplyOutcome::Applied { connects: 2 }
        );
        for _ in 0..2 {
            assert_eq!(
                h.apply(&id, "job-1").await.unwrap(),
                ApplyOutcome::AlreadyApplied { connects: 2 }
            );
        }

        let account = h.account(&id).await;
        assert_eq!(account.connects, 2);
        assert_eq!(account.applications.len(), 1);
        assert_eq!(h.titles(&id).await[0], "Already Applied");
    }

    #[tokio::test]
    async fn test_already_applied_even_with_zero_connects() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 1).await;

        h.apply(&id, "job-1").await.unwrap();
        assert_eq!(
            h.apply(&id, "job-1").await.unwrap(),
            ApplyOutcome::AlreadyApplied { connects: 0 }
        );
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_without_charge() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;

        let mut input = job("job-1");
        input.title = "  ".to_string();
        let result = h.apply_uc().execute(&id, input).await;
        assert!(matches!(result, Err(BoardError::Validation(_))));

        let result = h.apply_uc().execute(&id, job("")).await;
        assert!(matches!(result, Err(BoardError::Validation(_))));

        assert_eq!(h.account(&id).await.connects, 3);
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let h = Harness::new();
        let result = h.apply(&AccountId::new(), "job-1").await;
        assert!(matches!(result, Err(BoardError::AccountNotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_applies_spend_last_connect_once() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 1).await;

        let mut tasks = Vec::new();
        for i in 0..20 {
            let use_case = h.apply_uc();
            tasks.push(tokio::spawn(async move {
                use_case.execute(&id, job(&format!("job-{i}"))).await
            }));
        }

        let mut applied = 0;
        let mut refused = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(ApplyOutcome::Applied { connects }) => {
                    assert_eq!(connects, 0);
                    applied += 1;
                }
                Err(BoardError::QuotaExceeded) => refused += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(refused, 19);

        let account = h.account(&id).await;
        assert_eq!(account.connects, 0);
        assert_eq!(account.applications.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_same_job_applies_once() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let use_case = h.apply_uc();
            tasks.push(tokio::spawn(async move {
                use_case.execute(&id, job("job-1")).await
            }));
        }

        let mut applied = 0;
        for task in tasks {
            if let ApplyOutcome::Applied { .. } = task.await.unwrap().unwrap() {
                applied += 1;
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(h.account(&id).await.connects, 2);
    }

    #[tokio::test]
    async fn test_admin_verified_is_unlimited() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 1).await;
        h.admin_uc().grant_verification(&id).await.unwrap();

        for i in 0..10 {
            let outcome = h.apply(&id, &format!("job-{i}")).await.unwrap();
            assert_eq!(outcome, ApplyOutcome::Applied { connects: 1 });
        }

        // Revocation restores the quota; connects were never spent
        h.admin_uc().revoke_verification(&id).await.unwrap();
        h.apply(&id, "job-x").await.unwrap();
        assert!(matches!(
            h.apply(&id, "job-y").await,
            Err(BoardError::QuotaExceeded)
        ));
    }

    #[tokio::test]
    async fn test_payment_only_policy_ignores_admin_grant() {
        let h = Harness::with_config(BoardConfig {
            unlimited_policy: UnlimitedPolicy::PaymentOnly,
            ..BoardConfig::with_random_secret()
        });
        let id = h.seed("jane@example.com", 1).await;
        h.admin_uc().grant_verification(&id).await.unwrap();

        h.apply(&id, "job-1").await.unwrap();
        assert!(matches!(
            h.apply(&id, "job-2").await,
            Err(BoardError::QuotaExceeded)
        ));
    }

    #[tokio::test]
    async fn test_admin_grant_is_idempotent_and_notifies_once() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;

        let first = h.admin_uc().grant_verification(&id).await.unwrap();
        let second = h.admin_uc().grant_verification(&id).await.unwrap();
        assert!(first.admin_verified && second.admin_verified);
        assert_eq!(second.verification(h.clock.now()), Verification::AdminVerified);

        let titles = h.titles(&id).await;
        assert_eq!(titles.iter().filter(|t| *t == "Account Verified").count(), 1);
    }

    #[tokio::test]
    async fn test_adjust_connects_saturates() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;

        assert_eq!(h.admin_uc().adjust_connects(&id, 5).await.unwrap(), 8);
        assert_eq!(h.admin_uc().adjust_connects(&id, -100).await.unwrap(), 0);
        assert_eq!(h.titles(&id).await, vec!["Connects Added".to_string()]);
    }
}

// ============================================================================
// Verification Engine
// ============================================================================

#[cfg(test)]
mod verification_tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_email_once() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();

        let code = engine.issue_code(&id, CodePurpose::EmailVerify).await.unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(h.mailer.last_code_for("jane@example.com").unwrap(), code);

        engine.verify_email(&id, &code).await.unwrap();
        let account = h.account(&id).await;
        assert!(account.email_verified);
        assert!(account.email_code.is_none());
        assert_eq!(account.verification(h.clock.now()), Verification::EmailVerified);

        // Replay
        assert!(matches!(
            engine.verify_email(&id, &code).await,
            Err(BoardError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn test_wrong_code_keeps_pending_code() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();

        let code = engine.issue_code(&id, CodePurpose::EmailVerify).await.unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        assert!(matches!(
            engine.verify_email(&id, wrong).await,
            Err(BoardError::InvalidCode)
        ));
        engine.verify_email(&id, &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_code_expires_at_ttl() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();

        let code = engine.issue_code(&id, CodePurpose::EmailVerify).await.unwrap();
        h.clock.advance(Duration::minutes(10));

        assert!(matches!(
            engine.verify_email(&id, &code).await,
            Err(BoardError::CodeExpired)
        ));
        assert!(!h.account(&id).await.email_verified);
    }

    #[tokio::test]
    async fn test_code_valid_just_before_ttl() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();

        let code = engine.issue_code(&id, CodePurpose::EmailVerify).await.unwrap();
        h.clock.advance(Duration::minutes(10) - Duration::milliseconds(1));

        engine.verify_email(&id, &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_code() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();

        let first = engine.issue_code(&id, CodePurpose::EmailVerify).await.unwrap();
        let mut second = engine.issue_code(&id, CodePurpose::EmailVerify).await.unwrap();
        while second == first {
            second = engine.issue_code(&id, CodePurpose::EmailVerify).await.unwrap();
        }

        assert!(matches!(
            engine.verify_email(&id, &first).await,
            Err(BoardError::InvalidCode)
        ));
        engine.verify_email(&id, &second).await.unwrap();
    }

    #[tokio::test]
    async fn test_purposes_do_not_cross() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();

        let reset = engine.issue_code(&id, CodePurpose::PasswordReset).await.unwrap();
        assert!(matches!(
            engine.verify_email(&id, &reset).await,
            Err(BoardError::InvalidCode)
        ));
        assert!(h.account(&id).await.reset_code.is_some());
    }

    #[tokio::test]
    async fn test_failed_dispatch_persists_nothing() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();

        h.mailer.fail_next_sends(true);
        let result = engine.issue_code(&id, CodePurpose::EmailVerify).await;
        assert!(matches!(result, Err(BoardError::Gateway(_))));
        assert!(h.account(&id).await.email_code.is_none());
        assert_eq!(h.mailer.sent_count(), 0);

        h.mailer.fail_next_sends(false);
        let code = engine.issue_code(&id, CodePurpose::EmailVerify).await.unwrap();
        engine.verify_email(&id, &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_issue_by_email_unknown_account() {
        let h = Harness::new();
        let result = h
            .verification_uc()
            .issue_code_for_email("nobody@example.com", CodePurpose::PasswordReset)
            .await;
        assert!(matches!(result, Err(BoardError::AccountNotFound)));
    }

    #[tokio::test]
    async fn test_password_reset_swaps_credential() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();
        let login = LoginUseCase::new(h.store.clone(), h.config.clone(), h.clock());
        let new_password = "Mombasa!Beach2026";

        let code = engine
            .issue_code_for_email("jane@example.com", CodePurpose::PasswordReset)
            .await
            .unwrap();
        engine
            .reset_password_for_email("jane@example.com", &code, new_password.to_string())
            .await
            .unwrap();

        let account = h.account(&id).await;
        assert!(account.reset_code.is_none());
        assert!(account.email_verified);

        let old = login
            .execute(LoginInput {
                email: "jane@example.com".to_string(),
                password: PASSWORD.to_string(),
            })
            .await;
        assert!(matches!(old, Err(BoardError::InvalidCredentials)));
        login
            .execute(LoginInput {
                email: "jane@example.com".to_string(),
                password: new_password.to_string(),
            })
            .await
            .unwrap();

        // Replay
        let replay = engine
            .reset_password(&id, &code, "Kisumu#Lake2027".to_string())
            .await;
        assert!(matches!(replay, Err(BoardError::InvalidCode)));
    }

    #[tokio::test]
    async fn test_reset_with_bad_code_keeps_credential() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();

        let code = engine.issue_code(&id, CodePurpose::PasswordReset).await.unwrap();
        let wrong = if code == "999999" { "999998" } else { "999999" };
        let result = engine
            .reset_password(&id, wrong, "Mombasa!Beach2026".to_string())
            .await;
        assert!(matches!(result, Err(BoardError::InvalidCode)));

        let account = h.account(&id).await;
        assert!(account.reset_code.is_some());
        assert!(!account.email_verified);
        assert!(
            account
                .credential
                .verify(&RawPassword::for_login(PASSWORD.to_string()), None)
        );
    }

    #[tokio::test]
    async fn test_reset_with_weak_password_keeps_code() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();

        let code = engine.issue_code(&id, CodePurpose::PasswordReset).await.unwrap();
        let result = engine.reset_password(&id, &code, "short".to_string()).await;
        assert!(matches!(result, Err(BoardError::Validation(_))));

        // The code was not spent by the rejected attempt
        engine
            .reset_password(&id, &code, "Mombasa!Beach2026".to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_does_not_verify_email_when_disabled() {
        let h = Harness::with_config(BoardConfig {
            reset_verifies_email: false,
            ..BoardConfig::with_random_secret()
        });
        let id = h.seed("jane@example.com", 3).await;
        let engine = h.verification_uc();

        let code = engine.issue_code(&id, CodePurpose::PasswordReset).await.unwrap();
        engine
            .reset_password(&id, &code, "Mombasa!Beach2026".to_string())
            .await
            .unwrap();

        assert!(!h.account(&id).await.email_verified);
    }
}

// ============================================================================
// Payment Credit Processor
// ============================================================================

#[cfg(test)]
mod payment_tests {
    use super::*;

    #[tokio::test]
    async fn test_initiate_normalizes_phone_and_records_pending() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;

        let record = h
            .payment_uc()
            .initiate(&id, "0712 345 678", None)
            .await
            .unwrap();

        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.amount, 100);
        assert_eq!(record.connects_grant, 8);
        let push = h.gateway.last_push().unwrap();
        assert_eq!(push.amount, 100);
        assert_eq!(push.phone, "254712345678");
        assert_eq!(push.reference, record.external_reference);
        assert!(push.callback_url.starts_with(&format!("{}?sig=", h.config.payment_callback_url)));

        let stored = h
            .store
            .find_payment_by_reference(&record.external_reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.account_id, id);
    }

    #[tokio::test]
    async fn test_initiate_rejects_bad_input() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;

        assert!(matches!(
            h.payment_uc().initiate(&id, "12345", None).await,
            Err(BoardError::InvalidPhone)
        ));
        assert!(matches!(
            h.payment_uc().initiate(&id, "0712345678", Some(0)).await,
            Err(BoardError::Validation(_))
        ));
        assert!(matches!(
            h.payment_uc().initiate(&AccountId::new(), "0712345678", None).await,
            Err(BoardError::AccountNotFound)
        ));
        assert!(h.gateway.last_push().is_none());
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_record_pending() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        h.gateway.fail.store(true, Ordering::SeqCst);

        let result = h.payment_uc().initiate(&id, "0712345678", None).await;
        assert!(matches!(result, Err(BoardError::Gateway(_))));

        let payments = h.payment_uc().list(&id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Pending);

        // A late success callback for that record is still honoured
        let outcome = h.callback(&payments[0].external_reference, "success").await;
        assert_eq!(outcome, CallbackOutcome::Credited { connects: 11 });
    }

    #[tokio::test]
    async fn test_success_callback_credits_once() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let reference = h.initiate(&id).await;

        assert_eq!(
            h.callback(&reference, "success").await,
            CallbackOutcome::Credited { connects: 11 }
        );
        assert_eq!(
            h.callback(&reference, "success").await,
            CallbackOutcome::AlreadySettled
        );
        assert_eq!(
            h.callback(&reference, "failed").await,
            CallbackOutcome::AlreadySettled
        );

        let account = h.account(&id).await;
        let now = h.clock.now();
        assert_eq!(account.connects, 11);
        assert_eq!(
            account.verification(now),
            Verification::PaymentVerified(now + Duration::days(30))
        );

        let payment = h.store.find_payment_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Success);

        let titles = h.titles(&id).await;
        assert_eq!(titles.iter().filter(|t| *t == "Payment Received").count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callback_deliveries_credit_once() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let reference = h.initiate(&id).await;

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let use_case = h.payment_uc();
            let payload = h.signed(&reference, "success");
            tasks.push(tokio::spawn(async move { use_case.on_callback(payload).await }));
        }

        let mut credited = 0;
        for task in tasks {
            match task.await.unwrap() {
                CallbackOutcome::Credited { .. } => credited += 1,
                CallbackOutcome::AlreadySettled => {}
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        assert_eq!(credited, 1);
        assert_eq!(h.account(&id).await.connects, 11);
    }

    #[tokio::test]
    async fn test_failed_callback_changes_nothing_on_account() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let reference = h.initiate(&id).await;

        assert_eq!(
            h.callback(&reference, "failed").await,
            CallbackOutcome::MarkedFailed
        );

        let account = h.account(&id).await;
        assert_eq!(account.connects, 3);
        assert_eq!(account.verification(h.clock.now()), Verification::Unverified);

        let payment = h.store.find_payment_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);

        // Terminal: a later success report cannot revive it
        assert_eq!(
            h.callback(&reference, "success").await,
            CallbackOutcome::AlreadySettled
        );
        assert_eq!(h.account(&id).await.connects, 3);
        assert_eq!(h.titles(&id).await[0], "Payment Failed");
    }

    #[tokio::test]
    async fn test_unsigned_or_forged_callback_rejected() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let reference = h.initiate(&id).await;

        let unsigned = CallbackPayload {
            signature: None,
            ..h.signed(&reference, "success")
        };
        let forged = CallbackPayload {
            signature: Some(to_base64_url(&[7u8; 32])),
            ..h.signed(&reference, "success")
        };
        let garbled = CallbackPayload {
            signature: Some("%%%".to_string()),
            ..h.signed(&reference, "failed")
        };
        // Signature for one payment does not carry over to another
        let other = h.signed("CNX-SOMETHINGELSE", "success");
        let borrowed = CallbackPayload {
            signature: other.signature,
            ..h.signed(&reference, "success")
        };

        for payload in [unsigned, forged, garbled, borrowed] {
            assert_eq!(
                h.payment_uc().on_callback(payload).await,
                CallbackOutcome::Rejected
            );
        }

        let payment = h.store.find_payment_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(h.account(&id).await.connects, 3);
        assert!(h.titles(&id).await.is_empty());
    }

    #[tokio::test]
    async fn test_callback_url_signature_accepted() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let reference = h.initiate(&id).await;
        let push = h.gateway.last_push().unwrap();

        let outcome = h
            .payment_uc()
            .on_callback(CallbackPayload {
                external_reference: reference,
                status: "Success".to_string(),
                signature: Some(push.signature()),
            })
            .await;
        assert_eq!(outcome, CallbackOutcome::Credited { connects: 11 });
    }

    #[tokio::test]
    async fn test_failed_credit_leaves_payment_pending() {
        let h = Harness::new();
        // Owner no longer exists, so the credit step fails
        let record = PaymentRecord::new(
            AccountId::new(),
            100,
            "KES",
            PhoneNumber::from_db("254712345678"),
            8,
            h.clock.now(),
        );
        h.store.create_payment(&record).await.unwrap();

        assert_eq!(
            h.callback(&record.external_reference, "success").await,
            CallbackOutcome::Errored
        );
        let payment = h
            .store
            .find_payment_by_reference(&record.external_reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_reference_is_acknowledged() {
        let h = Harness::new();
        assert_eq!(
            h.callback("CNX-DOESNOTEXIST", "success").await,
            CallbackOutcome::UnknownReference
        );
    }

    #[tokio::test]
    async fn test_second_success_inside_window_not_credited() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;

        // Both prompts sent before either settles
        let first = h.initiate(&id).await;
        let second = h.initiate(&id).await;

        assert_eq!(
            h.callback(&first, "success").await,
            CallbackOutcome::Credited { connects: 11 }
        );
        assert_eq!(
            h.callback(&second, "success").await,
            CallbackOutcome::NotCredited
        );
        assert_eq!(h.account(&id).await.connects, 11);
    }

    #[tokio::test]
    async fn test_initiate_refused_while_window_open() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let reference = h.initiate(&id).await;
        h.callback(&reference, "success").await;

        assert!(matches!(
            h.payment_uc().initiate(&id, "0712345678", None).await,
            Err(BoardError::DuplicatePayment)
        ));

        // Window closes after 30 days
        h.clock.advance(Duration::days(30));
        h.payment_uc().initiate(&id, "0712345678", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_paid_window_is_unlimited_then_expires() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 0).await;
        let reference = h.initiate(&id).await;
        h.callback(&reference, "success").await;

        for i in 0..50 {
            h.apply(&id, &format!("job-{i}")).await.unwrap();
        }
        assert_eq!(h.account(&id).await.connects, 8);

        h.clock.advance(Duration::days(30));
        assert_eq!(
            h.apply(&id, "job-after").await.unwrap(),
            ApplyOutcome::Applied { connects: 7 }
        );
        assert_eq!(
            h.account(&id).await.verification(h.clock.now()),
            Verification::Unverified
        );
    }

    #[tokio::test]
    async fn test_payment_history_newest_first() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;

        let first = h.initiate(&id).await;
        h.clock.advance(Duration::seconds(5));
        let second = h.initiate(&id).await;

        let history = h.payment_uc().list(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].external_reference, second);
        assert_eq!(history[1].external_reference, first);
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[cfg(test)]
mod notification_tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_read_and_read_all() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        for i in 0..3 {
            h.clock.advance(Duration::seconds(1));
            h.apply(&id, &format!("job-{i}")).await.unwrap();
        }

        let inbox = h.notifications_uc();
        let list = inbox.list(&id).await.unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.iter().all(|n| !n.read && n.kind == NotificationKind::Success));

        inbox.mark_read(&id, &list[0].id).await.unwrap();
        assert_eq!(inbox.mark_all_read(&id).await.unwrap(), 2);
        assert!(inbox.list(&id).await.unwrap().iter().all(|n| n.read));
    }

    #[tokio::test]
    async fn test_cannot_mark_another_accounts_notification() {
        let h = Harness::new();
        let jane = h.seed("jane@example.com", 3).await;
        let otieno = h.seed("otieno@example.com", 3).await;
        h.apply(&jane, "job-1").await.unwrap();

        let inbox = h.notifications_uc();
        let note = inbox.list(&jane).await.unwrap().remove(0);

        assert!(matches!(
            inbox.mark_read(&otieno, &note.id).await,
            Err(BoardError::NotificationNotFound)
        ));
        assert!(!inbox.list(&jane).await.unwrap()[0].read);
    }
}

// ============================================================================
// Wallet
// ============================================================================

#[cfg(test)]
mod wallet_tests {
    use super::*;

    fn withdrawal(amount: i64) -> WithdrawalInput {
        WithdrawalInput {
            amount,
            method: "mpesa".to_string(),
            address: "254712345678".to_string(),
        }
    }

    async fn verified_with_balance(h: &Harness, balance: i64) -> AccountId {
        let id = h.seed("jane@example.com", 3).await;
        h.admin_uc().grant_verification(&id).await.unwrap();
        h.set_balance(&id, balance).await;
        id
    }

    #[tokio::test]
    async fn test_request_rules() {
        let h = Harness::new();
        let unverified = h.seed("otieno@example.com", 3).await;
        h.set_balance(&unverified, 5_000).await;

        assert!(matches!(
            h.wallet_uc().request_withdrawal(&unverified, withdrawal(2_000)).await,
            Err(BoardError::Forbidden(_))
        ));

        let id = verified_with_balance(&h, 5_000).await;
        assert!(matches!(
            h.wallet_uc().request_withdrawal(&id, withdrawal(1_000)).await,
            Err(BoardError::Validation(_))
        ));
        assert!(matches!(
            h.wallet_uc().request_withdrawal(&id, withdrawal(6_000)).await,
            Err(BoardError::InsufficientBalance)
        ));

        let pending = h.wallet_uc().request_withdrawal(&id, withdrawal(2_000)).await.unwrap();
        assert_eq!(pending.status, WithdrawalStatus::Pending);
        // Not reserved until approval
        assert_eq!(h.wallet_uc().balance(&id).await.unwrap(), 5_000);
    }

    #[tokio::test]
    async fn test_approve_debits_once() {
        let h = Harness::new();
        let id = verified_with_balance(&h, 5_000).await;
        let wallet = h.wallet_uc();
        let pending = wallet.request_withdrawal(&id, withdrawal(2_000)).await.unwrap();

        let approved = wallet.approve(&pending.id).await.unwrap();
        assert_eq!(approved.status, WithdrawalStatus::Approved);
        assert!(approved.decided_at.is_some());
        assert_eq!(wallet.balance(&id).await.unwrap(), 3_000);

        assert!(matches!(
            wallet.approve(&pending.id).await,
            Err(BoardError::AlreadyDecided)
        ));
        assert!(matches!(
            wallet.reject(&pending.id).await,
            Err(BoardError::AlreadyDecided)
        ));
        assert_eq!(wallet.balance(&id).await.unwrap(), 3_000);
        assert!(wallet.list_pending().await.unwrap().is_empty());
        assert_eq!(h.titles(&id).await[0], "Withdrawal Approved");
    }

    #[tokio::test]
    async fn test_approve_fails_when_balance_dropped() {
        let h = Harness::new();
        let id = verified_with_balance(&h, 5_000).await;
        let wallet = h.wallet_uc();
        let first = wallet.request_withdrawal(&id, withdrawal(4_000)).await.unwrap();
        let second = wallet.request_withdrawal(&id, withdrawal(3_000)).await.unwrap();

        wallet.approve(&first.id).await.unwrap();
        assert!(matches!(
            wallet.approve(&second.id).await,
            Err(BoardError::InsufficientBalance)
        ));

        assert_eq!(wallet.balance(&id).await.unwrap(), 1_000);
        let pending = wallet.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
    }

    #[tokio::test]
    async fn test_reject_leaves_balance() {
        let h = Harness::new();
        let id = verified_with_balance(&h, 5_000).await;
        let wallet = h.wallet_uc();
        let pending = wallet.request_withdrawal(&id, withdrawal(2_000)).await.unwrap();

        let rejected = wallet.reject(&pending.id).await.unwrap();
        assert_eq!(rejected.status, WithdrawalStatus::Rejected);
        assert_eq!(wallet.balance(&id).await.unwrap(), 5_000);
        assert!(matches!(
            wallet.approve(&pending.id).await,
            Err(BoardError::AlreadyDecided)
        ));
        assert!(matches!(
            wallet.reject(&kernel::id::WithdrawalId::new()).await,
            Err(BoardError::WithdrawalNotFound)
        ));
    }
}

// ============================================================================
// HTTP
// ============================================================================

#[cfg(test)]
mod router_tests {
    use super::*;
    use crate::domain::entity::account::AccountRole;
    use crate::presentation::router::board_router_generic;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app(h: &Harness) -> Router {
        board_router_generic(
            (*h.store).clone(),
            (*h.mailer).clone(),
            (*h.gateway).clone(),
            (*h.config).clone(),
            h.clock(),
        )
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn login(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    fn apply_body() -> Value {
        json!({ "title": "Rust Engineer", "company": "Acme Remote" })
    }

    #[tokio::test]
    async fn test_register_verify_and_me() {
        let h = Harness::new();
        let app = app(&h);

        let (status, body) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "name": "Jane Wanjiku",
                "email": "jane@example.com",
                "password": PASSWORD,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["connects"], 3);
        assert_eq!(body["verificationSent"], true);

        let token = login(&app, "jane@example.com").await;
        let code = h.mailer.last_code_for("jane@example.com").unwrap();

        let (status, _) = send(
            &app,
            "POST",
            "/auth/verify-email",
            Some(&token),
            Some(json!({ "code": code })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, me) = send(&app, "GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["emailVerified"], true);
        assert_eq!(me["verification"]["state"], "emailVerified");
        assert_eq!(me["connects"], 3);
    }

    #[tokio::test]
    async fn test_register_survives_mailer_outage() {
        let h = Harness::new();
        h.mailer.fail_next_sends(true);
        let app = app(&h);

        let (status, body) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "name": "Jane Wanjiku",
                "email": "jane@example.com",
                "password": PASSWORD,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["verificationSent"], false);
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let h = Harness::new();
        let app = app(&h);

        let (status, _) = send(&app, "GET", "/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/auth/me", Some("forged.token.sig"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_payment_required() {
        let h = Harness::new();
        h.seed("jane@example.com", 1).await;
        let app = app(&h);
        let token = login(&app, "jane@example.com").await;

        let (status, body) =
            send(&app, "POST", "/applications/job-1", Some(&token), Some(apply_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applied"], true);
        assert_eq!(body["connects"], 0);

        let (status, body) =
            send(&app, "POST", "/applications/job-1", Some(&token), Some(apply_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alreadyApplied"], true);

        let (status, body) =
            send(&app, "POST", "/applications/job-2", Some(&token), Some(apply_body())).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["requiresPurchase"], true);

        let (status, body) = send(&app, "GET", "/applications", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applications"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_callback_acknowledged_but_only_signed_deliveries_credit() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        let app = app(&h);
        let token = login(&app, "jane@example.com").await;

        let (status, body) = send(
            &app,
            "POST",
            "/payments/stk-push",
            Some(&token),
            Some(json!({ "phone": "0712345678" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
        assert!(body.get("externalReference").is_none());

        let (status, history) = send(&app, "GET", "/payments", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history[0]["id"], body["paymentId"]);
        assert!(history[0].get("externalReference").is_none());

        let push = h.gateway.last_push().unwrap();
        let callback = json!({ "external_reference": push.reference, "status": "success" });

        // A caller who learned the reference still cannot credit the account
        for uri in [
            "/payments/callback".to_string(),
            "/payments/callback?sig=AAAA".to_string(),
            format!("/payments/callback?sig={}", to_base64_url(&[1u8; 32])),
        ] {
            let (status, _) = send(&app, "POST", &uri, None, Some(callback.clone())).await;
            assert_eq!(status, StatusCode::OK);
        }
        assert_eq!(h.account(&id).await.connects, 3);

        let signed_uri = format!("/payments/callback?sig={}", push.signature());
        for _ in 0..2 {
            let (status, _) = send(&app, "POST", &signed_uri, None, Some(callback.clone())).await;
            assert_eq!(status, StatusCode::OK);
        }
        assert_eq!(h.account(&id).await.connects, 11);

        let (status, _) = send(
            &app,
            "POST",
            &signed_uri,
            None,
            Some(json!({ "unexpected": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            "POST",
            "/payments/callback",
            None,
            Some(json!({ "externalReference": "CNX-UNKNOWN", "status": "success" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_password_reset_signs_out_existing_tokens() {
        let h = Harness::new();
        h.seed("jane@example.com", 3).await;
        let app = app(&h);
        let old_token = login(&app, "jane@example.com").await;

        let (status, _) = send(
            &app,
            "POST",
            "/auth/forgot-password",
            None,
            Some(json!({ "email": "jane@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let code = h.mailer.last_code_for("jane@example.com").unwrap();

        let (status, _) = send(
            &app,
            "POST",
            "/auth/reset-password",
            None,
            Some(json!({
                "email": "jane@example.com",
                "code": code,
                "newPassword": "Mombasa#Remote2026",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", "/auth/me", Some(&old_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "jane@example.com", "password": "Mombasa#Remote2026" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let new_token = body["token"].as_str().unwrap().to_string();
        let (status, _) = send(&app, "GET", "/auth/me", Some(&new_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_revoke_signs_out_account() {
        let h = Harness::new();
        let user = h.seed("jane@example.com", 3).await;
        let admin = h.seed("admin@example.com", 0).await;
        h.store
            .modify_account(&admin, |a| {
                a.role = AccountRole::Admin;
                Ok(())
            })
            .await
            .unwrap();
        let app = app(&h);
        let user_token = login(&app, "jane@example.com").await;
        let admin_token = login(&app, "admin@example.com").await;

        let (status, _) = send(
            &app,
            "POST",
            &format!("/admin/accounts/{user}/verify"),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "GET", "/auth/me", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/admin/accounts/{user}/unverify"),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", "/auth/me", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, "GET", "/auth/me", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin_role() {
        let h = Harness::new();
        let user = h.seed("jane@example.com", 1).await;
        let admin = h.seed("admin@example.com", 0).await;
        h.store
            .modify_account(&admin, |a| {
                a.role = AccountRole::Admin;
                Ok(())
            })
            .await
            .unwrap();
        let app = app(&h);

        let user_token = login(&app, "jane@example.com").await;
        let admin_token = login(&app, "admin@example.com").await;
        let verify_uri = format!("/admin/accounts/{user}/verify");

        let (status, _) = send(&app, "POST", &verify_uri, Some(&user_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, "POST", &verify_uri, Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["adminVerified"], true);
        assert_eq!(body["unlimited"], true);

        let (status, _) = send(
            &app,
            "POST",
            "/admin/accounts/not-a-uuid/verify",
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/admin/accounts/{user}/connects"),
            Some(&admin_token),
            Some(json!({ "delta": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connects"], 5);
    }

    #[tokio::test]
    async fn test_notification_routes() {
        let h = Harness::new();
        let id = h.seed("jane@example.com", 3).await;
        h.apply(&id, "job-1").await.unwrap();
        let app = app(&h);
        let token = login(&app, "jane@example.com").await;

        let (status, list) = send(&app, "GET", "/notifications", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let note_id = list[0]["id"].as_str().unwrap().to_string();
        assert_eq!(list[0]["read"], false);

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/notifications/{note_id}/read"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/notifications/{}/read", kernel::id::NotificationId::new()),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) =
            send(&app, "PATCH", "/notifications/read-all", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 0);
    }
}
