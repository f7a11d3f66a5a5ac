//! Infrastructure Layer
//!
//! Storage backends and the outbound email / payment adapters.

pub mod email;
pub mod memory;
pub mod payment_gateway;
pub mod postgres;

pub use email::{EmailApiConfig, HttpEmailSender, LogEmailSender};
pub use memory::MemoryBoardRepository;
pub use payment_gateway::{HttpPaymentGateway, PaymentApiConfig};
pub use postgres::PgBoardRepository;
