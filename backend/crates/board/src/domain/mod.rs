//! Domain Layer
//!
//! Contains entities, value objects, repository and collaborator traits.

pub mod entity;
pub mod gateway;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    account::Account, notification::Notification, payment::PaymentRecord,
    withdrawal::Withdrawal,
};
pub use gateway::{EmailSender, PaymentGateway};
pub use repository::{
    AccountRepository, BoardStore, NotificationRepository, PaymentRepository, WithdrawalRepository,
};
