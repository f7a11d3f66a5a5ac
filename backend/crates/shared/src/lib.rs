//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of the job board vocabulary:
//! - Common error types and result aliases
//! - Typed entity IDs
//! - The clock abstraction every time-boxed rule is evaluated against
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all domains.

pub mod clock;
pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
