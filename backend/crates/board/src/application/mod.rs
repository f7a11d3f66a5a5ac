//! Application Layer
//!
//! Use cases and application services.

pub mod admin;
pub mod apply_job;
pub mod config;
pub mod get_account;
pub mod login;
pub mod notifications;
pub mod payment;
pub mod register;
pub mod session;
pub mod verification;
pub mod wallet;

// Re-exports
pub use admin::AdminUseCase;
pub use apply_job::{ApplyInput, ApplyJobUseCase};
pub use config::{BoardConfig, UnlimitedPolicy};
pub use get_account::GetAccountUseCase;
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use notifications::{NotificationsUseCase, Notifier};
pub use payment::{CallbackOutcome, CallbackPayload, PaymentUseCase};
pub use register::{RegisterInput, RegisterOutput, RegisterUseCase};
pub use verification::VerificationUseCase;
pub use wallet::{WalletUseCase, WithdrawalInput};
