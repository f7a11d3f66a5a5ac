//! Domain Entities

pub mod account;
pub mod notification;
pub mod payment;
pub mod withdrawal;
