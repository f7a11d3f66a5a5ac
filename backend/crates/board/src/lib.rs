//! Job Board Account Core
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository and gateway traits
//! - `application/` - Use cases and application services
//! - `infra/` - PostgreSQL / in-memory stores, email and payment adapters
//! - `presentation/` - HTTP handlers, DTOs, router, extractors
//!
//! ## Features
//! - Registration and login with email + password
//! - Six-digit one-time codes for email verification and password reset
//! - Connects quota gating job applications, lifted by admin or paid grants
//! - M-Pesa STK push payments with an idempotent gateway callback
//! - Notification inbox and a wallet with admin-approved withdrawals
//!
//! ## Consistency Model
//! - Every read-modify-write of an account goes through
//!   `AccountRepository::modify_account` and is serialized per account
//! - A payment leaves `Pending` once, in the same transaction that credits
//!   the account, so a replayed callback can never credit twice
//! - Callbacks must carry the per-payment signature handed to the gateway
//! - Bearer tokens die with their session version (password reset, admin
//!   revocation)
//! - Email and gateway calls are bounded by a timeout and never made while
//!   an account is locked

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::BoardConfig;
pub use error::{BoardError, BoardResult};
pub use infra::memory::MemoryBoardRepository;
pub use infra::postgres::PgBoardRepository;
pub use presentation::router::{board_router, board_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod adapters {
    pub use crate::infra::email::{EmailApiConfig, HttpEmailSender, LogEmailSender};
    pub use crate::infra::payment_gateway::{HttpPaymentGateway, PaymentApiConfig};
}
