//! Scenario catalog
//!
//! A scenario is a plain async function over a [`ScenarioContext`]; the
//! runner gives every scenario a fresh browser session and a fresh context.

use futures::future::BoxFuture;
use ibank_common::{AccountStatus, DataGenerator, Fixtures, RegisteredUser};
use std::fmt;
use std::sync::Arc;

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::pages::{DashboardPage, LoginOutcome};
use crate::registration::{register_new, UserRegistry};
use crate::session::Session;

pub mod login;
pub mod transfer;

pub type ScenarioFn = fn(ScenarioContext) -> BoxFuture<'static, E2eResult<()>>;

/// One end-to-end check against the application
#[derive(Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub tags: &'static [&'static str],

    /// Application defect this scenario is known to trip over
    pub known_issue: Option<&'static str>,

    pub body: ScenarioFn,
}

impl Scenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| *t == tag)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("known_issue", &self.known_issue)
            .finish()
    }
}

/// Everything a scenario body may use
pub struct ScenarioContext {
    pub session: Session,
    pub registry: Arc<dyn UserRegistry>,
    pub generator: DataGenerator,
}

impl ScenarioContext {
    pub fn new(session: Session, registry: Arc<dyn UserRegistry>, generator: DataGenerator) -> Self {
        Self {
            session,
            registry,
            generator,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        self.session.config()
    }

    pub fn fixtures(&self) -> &Fixtures {
        &self.session.config().fixtures
    }

    /// Create a fresh user with `status` in the application
    pub async fn register(&mut self, status: AccountStatus) -> E2eResult<RegisteredUser> {
        register_new(self.registry.as_ref(), &mut self.generator, status).await
    }

    /// Log in as the fixture owner, through verification when asked for a code
    pub async fn login_to_dashboard(&self) -> E2eResult<DashboardPage> {
        let fixtures = self.fixtures();
        let login = self.session.open_login().await?;
        match login.submit_credentials(&fixtures.auth).await? {
            LoginOutcome::Authenticated(dashboard) => Ok(dashboard),
            LoginOutcome::AwaitingVerification(page) => page.verify(&fixtures.verification_code).await,
            LoginOutcome::Rejected { notification, .. } => Err(E2eError::assertion(format!(
                "fixture user '{}' was rejected: {}",
                fixtures.auth.login, notification.message
            ))),
        }
    }
}

/// Every scenario, login first
pub fn catalog() -> Vec<Scenario> {
    let mut all = login::scenarios();
    all.extend(transfer::scenarios());
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let all = catalog();
        let names: HashSet<_> = all.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn test_catalog_shape() {
        let all = catalog();
        assert_eq!(all.iter().filter(|s| s.has_tag("login")).count(), 5);
        assert_eq!(all.iter().filter(|s| s.has_tag("transfer")).count(), 10);
        assert_eq!(all.iter().filter(|s| s.known_issue.is_some()).count(), 6);
        assert!(all
            .iter()
            .filter(|s| s.known_issue.is_some())
            .all(|s| s.has_tag("transfer")));
    }
}
