use futures::future::{BoxFuture, FutureExt};
use ibank_common::{AccountStatus, Credentials};
use tracing::info;

use super::{Scenario, ScenarioContext};
use crate::error::{E2eError, E2eResult};
use crate::pages::{LoginOutcome, RejectionReason};
use crate::{ensure, ensure_eq};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "login_active_user",
            description: "A registered active user reaches the personal account",
            tags: &["login", "smoke"],
            known_issue: None,
            body: active_user,
        },
        Scenario {
            name: "login_unregistered_user",
            description: "Credentials nobody registered are refused",
            tags: &["login"],
            known_issue: None,
            body: unregistered_user,
        },
        Scenario {
            name: "login_wrong_login",
            description: "A registered password with a random login is refused",
            tags: &["login"],
            known_issue: None,
            body: wrong_login,
        },
        Scenario {
            name: "login_wrong_password",
            description: "A registered login with a random password is refused",
            tags: &["login"],
            known_issue: None,
            body: wrong_password,
        },
        Scenario {
            name: "login_blocked_user",
            description: "A blocked user is told the account is blocked",
            tags: &["login"],
            known_issue: None,
            body: blocked_user,
        },
    ]
}

/// Submit `credentials` and require a banner of kind `expected`
async fn expect_rejection(
    ctx: &ScenarioContext,
    credentials: &Credentials,
    expected: RejectionReason,
) -> E2eResult<()> {
    let outcome = ctx.session.open_login().await?.submit_credentials(credentials).await?;
    match outcome {
        LoginOutcome::Rejected {
            notification, reason, ..
        } => {
            ensure_eq!(reason, expected, "banner '{}'", notification.message);
            Ok(())
        }
        other => Err(E2eError::assertion(format!(
            "'{}' should have been refused, got {}",
            credentials.login,
            other.describe()
        ))),
    }
}

fn active_user(mut ctx: ScenarioContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let user = ctx.register(AccountStatus::Active).await?;
        let outcome = ctx
            .session
            .open_login()
            .await?
            .submit_credentials(&user.credentials())
            .await?;
        ensure!(
            outcome.is_accepted(),
            "active user '{}' was not let in: {}",
            user.login,
            outcome.describe()
        );
        info!("'{}' logged in", user.login);
        Ok(())
    }
    .boxed()
}

fn unregistered_user(mut ctx: ScenarioContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let credentials = ctx.generator.credentials();
        expect_rejection(&ctx, &credentials, RejectionReason::InvalidCredentials).await
    }
    .boxed()
}

fn wrong_login(mut ctx: ScenarioContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let user = ctx.register(AccountStatus::Active).await?;
        let credentials = user.credentials().with_login(ctx.generator.login());
        expect_rejection(&ctx, &credentials, RejectionReason::InvalidCredentials).await
    }
    .boxed()
}

fn wrong_password(mut ctx: ScenarioContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let user = ctx.register(AccountStatus::Active).await?;
        let credentials = user.credentials().with_password(ctx.generator.password());
        expect_rejection(&ctx, &credentials, RejectionReason::InvalidCredentials).await
    }
    .boxed()
}

fn blocked_user(mut ctx: ScenarioContext) -> BoxFuture<'static, E2eResult<()>> {
    async move {
        let user = ctx.register(AccountStatus::Blocked).await?;
        expect_rejection(&ctx, &user.credentials(), RejectionReason::UserBlocked).await
    }
    .boxed()
}
