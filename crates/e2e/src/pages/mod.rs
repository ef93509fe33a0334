//! Page objects
//!
//! Each page is constructed only once its distinguishing element is visible,
//! and every action returns the page that follows it. Pages share nothing but
//! the [`Session`](crate::session::Session) they are handed.

mod dashboard;
mod login;
mod transfer;
mod verification;

pub use dashboard::DashboardPage;
pub use login::{LoginOutcome, LoginPage, RejectionReason};
pub use transfer::{TransferOutcome, TransferPage};
pub use verification::VerificationPage;
