//! ibank E2E Test Framework
//!
//! Page-object harness for the ibank internet-banking web application:
//! - Drives a real browser through a persistent Playwright bridge
//! - Waits for every page read with a bounded poll instead of fixed sleeps
//! - Models login, verification, dashboard and transfer as typed pages
//! - Runs a catalog of login and transfer scenarios and reports JSON results
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ScenarioRunner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  per scenario: SessionFactory::launch() -> Session          │
//! │    LoginPage ──submit_credentials──▶ VerificationPage       │
//! │         │                                  │ verify         │
//! │         └──────────────▶ DashboardPage ◀───┘                │
//! │                            │ select_card_to_transfer        │
//! │                            ▼                                │
//! │                        TransferPage ──settle──▶ Dashboard   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ElementLocator + Wait      (polling reads)                 │
//! │  Driver: PlaywrightDriver | FakeBrowser                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod fake;
pub mod locator;
pub mod pages;
pub mod playwright;
pub mod registration;
pub mod runner;
pub mod scenarios;
pub mod selectors;
pub mod server;
pub mod session;
pub mod wait;

pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult};
pub use runner::{ScenarioRunner, SuiteResult};
pub use scenarios::{catalog, Scenario, ScenarioContext};
pub use session::{Session, SessionFactory};
