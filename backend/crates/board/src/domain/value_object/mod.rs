//! Value Object Module

pub mod credential;
pub mod email;
pub mod phone;
