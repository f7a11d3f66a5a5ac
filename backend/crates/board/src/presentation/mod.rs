//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and authentication extractors.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod router;

pub use extract::{AdminAccount, AuthAccount};
pub use handlers::BoardAppState;
pub use router::{board_router, board_router_generic};
