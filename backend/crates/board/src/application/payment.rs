//! Payment Use Case
//!
//! STK push initiation and the gateway callback that turns a confirmed
//! payment into connects and a paid unlimited window.
//!
//! The callback endpoint is public, so each payment hands the gateway a
//! callback URL carrying an HMAC of its reference. Deliveries without a
//! matching signature are dropped before any lookup.
//!
//! Double credit is prevented twice over: a successful payment leaves
//! `Pending` in the same transaction that credits the account, so only one
//! delivery can ever apply it, and the credit itself is skipped while the
//! account still holds an open paid window. A failed credit leaves the
//! payment `Pending` for the next delivery.

use std::sync::Arc;

use kernel::clock::Clock;
use kernel::id::AccountId;
use platform::crypto::{from_base64_url, hmac_sha256, to_base64_url, verify_hmac_sha256};

use crate::application::config::BoardConfig;
use crate::application::notifications::Notifier;
use crate::domain::entity::notification::NotificationKind;
use crate::domain::entity::payment::{PaymentRecord, PaymentStatus};
use crate::domain::gateway::PaymentGateway;
use crate::domain::repository::{AccountRepository, NotificationRepository, PaymentRepository};
use crate::domain::value_object::phone::PhoneNumber;
use crate::error::{BoardError, BoardResult};

/// Gateway callback, already decoded from the wire
#[derive(Debug, Clone)]
pub struct CallbackPayload {
    pub external_reference: String,
    pub status: String,
    /// `sig` query parameter of the callback URL
    pub signature: Option<String>,
}

/// What a callback delivery did. The gateway is acknowledged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Missing or wrong signature; nothing was touched
    Rejected,
    UnknownReference,
    /// Replay of a delivery that was already applied
    AlreadySettled,
    MarkedFailed,
    Credited { connects: u32 },
    /// Payment recorded as successful, but a paid window was still open
    NotCredited,
    /// Internal failure, logged
    Errored,
}

/// Callback URL handed to the gateway for one payment
pub fn signed_callback_url(config: &BoardConfig, external_reference: &str) -> String {
    let signature = hmac_sha256(&config.callback_secret, external_reference.as_bytes());
    let separator = if config.payment_callback_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}sig={}",
        config.payment_callback_url,
        separator,
        to_base64_url(&signature)
    )
}

pub fn verify_callback_signature(
    config: &BoardConfig,
    external_reference: &str,
    signature: &str,
) -> bool {
    match from_base64_url(signature) {
        Ok(signature) => verify_hmac_sha256(
            &config.callback_secret,
            external_reference.as_bytes(),
            &signature,
        ),
        Err(_) => false,
    }
}

/// Payment use case
pub struct PaymentUseCase<A, P, N, G>
where
    A: AccountRepository,
    P: PaymentRepository,
    N: NotificationRepository,
    G: PaymentGateway,
{
    accounts: Arc<A>,
    payments: Arc<P>,
    gateway: Arc<G>,
    notifier: Notifier<N>,
    config: Arc<BoardConfig>,
    clock: Arc<dyn Clock>,
}

impl<A, P, N, G> PaymentUseCase<A, P, N, G>
where
    A: AccountRepository,
    P: PaymentRepository,
    N: NotificationRepository,
    G: PaymentGateway,
{
    pub fn new(
        accounts: Arc<A>,
        payments: Arc<P>,
        notifications: Arc<N>,
        gateway: Arc<G>,
        config: Arc<BoardConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            payments,
            gateway,
            notifier: Notifier::new(notifications, clock.clone()),
            config,
            clock,
        }
    }

    /// Create a pending payment and ask the gateway to push the STK prompt
    ///
    /// If the gateway fails the record stays `Pending`; a late callback for
    /// it is still honoured.
    pub async fn initiate(
        &self,
        account_id: &AccountId,
        phone: &str,
        amount: Option<i64>,
    ) -> BoardResult<PaymentRecord> {
        let phone = PhoneNumber::normalize(
            phone,
            &self.config.phone_country_code,
            self.config.phone_subscriber_digits,
        )?;
        let amount = amount.unwrap_or(self.config.payment_amount);
        if amount <= 0 {
            return Err(BoardError::Validation("Amount must be positive".into()));
        }

        let account = self
            .accounts
            .find_account(account_id)
            .await?
            .ok_or(BoardError::AccountNotFound)?;

        let now = self.clock.now();
        if account.has_active_payment(now) {
            return Err(BoardError::DuplicatePayment);
        }

        let record = PaymentRecord::new(
            *account_id,
            amount,
            self.config.payment_currency.clone(),
            phone,
            self.config.payment_connects_grant,
            now,
        );
        self.payments.create_payment(&record).await?;

        let callback_url = signed_callback_url(&self.config, &record.external_reference);
        let forwarded = tokio::time::timeout(
            self.config.outbound_timeout,
            self.gateway.initiate_payment(
                record.amount,
                &record.phone,
                &record.external_reference,
                &callback_url,
            ),
        )
        .await
        .map_err(|_| BoardError::Gateway("Payment gateway timed out".into()))
        .and_then(|r| r);

        if let Err(e) = forwarded {
            tracing::warn!(
                account_id = %account_id,
                reference = %record.external_reference,
                error = %e,
                "STK push not accepted; payment left pending"
            );
            return Err(e);
        }

        tracing::info!(
            account_id = %account_id,
            reference = %record.external_reference,
            amount = record.amount,
            "STK push initiated"
        );

        Ok(record)
    }

    /// Apply a gateway callback. Never fails: errors are logged and
    /// reported as `CallbackOutcome::Errored`.
    pub async fn on_callback(&self, payload: CallbackPayload) -> CallbackOutcome {
        match self.process_callback(&payload).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    reference = %payload.external_reference,
                    error = %e,
                    "Payment callback processing failed"
                );
                CallbackOutcome::Errored
            }
        }
    }

    async fn process_callback(&self, payload: &CallbackPayload) -> BoardResult<CallbackOutcome> {
        let reference = payload.external_reference.trim();

        let signed = payload
            .signature
            .as_deref()
            .is_some_and(|sig| verify_callback_signature(&self.config, reference, sig));
        if !signed {
            tracing::warn!(reference, "Payment callback with missing or bad signature dropped");
            return Ok(CallbackOutcome::Rejected);
        }

        let Some(existing) = self.payments.find_payment_by_reference(reference).await? else {
            tracing::warn!(reference, "Callback for unknown payment reference");
            return Ok(CallbackOutcome::UnknownReference);
        };
        if existing.status.is_terminal() {
            tracing::debug!(reference, status = existing.status.as_str(), "Callback replay ignored");
            return Ok(CallbackOutcome::AlreadySettled);
        }

        let now = self.clock.now();

        if PaymentStatus::from_callback(&payload.status) == PaymentStatus::Failed {
            // Only one concurrent delivery gets past this swap
            let Some(payment) = self
                .payments
                .settle_payment(reference, PaymentStatus::Failed, now)
                .await?
            else {
                return Ok(CallbackOutcome::AlreadySettled);
            };

            tracing::info!(
                account_id = %payment.account_id,
                reference,
                reported = %payload.status,
                "Payment failed"
            );
            self.notifier
                .emit(
                    &payment.account_id,
                    "Payment Failed",
                    "Your payment was not completed. No charges were applied.",
                    NotificationKind::Warning,
                )
                .await;
            return Ok(CallbackOutcome::MarkedFailed);
        }

        let validity = self.config.payment_validity();
        let settled = self
            .payments
            .settle_and_credit(reference, now, |account, payment| {
                Ok(account
                    .credit_payment(payment.connects_grant, validity, now)
                    .then_some(account.connects))
            })
            .await?;

        let Some((payment, credited)) = settled else {
            return Ok(CallbackOutcome::AlreadySettled);
        };
        let grant = payment.connects_grant;

        match credited {
            Some(connects) => {
                tracing::info!(
                    account_id = %payment.account_id,
                    reference,
                    grant,
                    connects,
                    "Payment credited"
                );
                self.notifier
                    .emit(
                        &payment.account_id,
                        "Payment Received",
                        format!(
                            "Your payment was received. {grant} connects were added and your account is verified for {} days.",
                            validity.num_days()
                        ),
                        NotificationKind::Success,
                    )
                    .await;
                Ok(CallbackOutcome::Credited { connects })
            }
            None => {
                tracing::warn!(
                    account_id = %payment.account_id,
                    reference,
                    "Payment succeeded while a paid window was open; not credited"
                );
                Ok(CallbackOutcome::NotCredited)
            }
        }
    }

    /// Payment history, newest first
    pub async fn list(&self, account_id: &AccountId) -> BoardResult<Vec<PaymentRecord>> {
        self.payments.list_payments(account_id).await
    }
}
