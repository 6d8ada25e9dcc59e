//! HTTP handlers

pub mod account;
pub mod health;
pub mod transfer;

pub use account::{create_account, get_account};
pub use health::health_check;
pub use transfer::transfer_money;
