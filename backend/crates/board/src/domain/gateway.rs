//! Outbound Collaborators
//!
//! Email delivery and the mobile-money gateway. Use cases wrap every call
//! in a timeout and never call out while an account is locked.

use crate::domain::value_object::{email::Email, phone::PhoneNumber};
use crate::error::BoardResult;

/// Transactional email delivery
#[trait_variant::make(EmailSender: Send)]
pub trait LocalEmailSender {
    /// `Gateway` error if the provider rejects or cannot be reached
    async fn send(&self, to: &Email, subject: &str, html: &str) -> BoardResult<()>;
}

/// STK push initiation
///
/// The gateway later reports the outcome asynchronously to `callback_url`
/// with `{externalReference, status}`.
#[trait_variant::make(PaymentGateway: Send)]
pub trait LocalPaymentGateway {
    async fn initiate_payment(
        &self,
        amount: i64,
        phone: &PhoneNumber,
        external_reference: &str,
        callback_url: &str,
    ) -> BoardResult<()>;
}
