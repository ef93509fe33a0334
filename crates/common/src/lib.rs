//! ibank Common Library
//!
//! Data model shared by the ibank E2E harness: credentials, cards, balances
//! parsed from dashboard text, transfer requests and randomized test data.

pub mod balance;
pub mod data;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use balance::{Balance, BalanceMarkers, BalanceSnapshot};
pub use data::{DataGenerator, Fixtures};
pub use error::{Error, Result};
pub use types::*;
