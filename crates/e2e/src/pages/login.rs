use ibank_common::{AuthInfo, Credentials, ErrorNotification};
use serde::Serialize;
use tracing::{debug, info};

use super::{DashboardPage, VerificationPage};
use crate::config::UiTexts;
use crate::error::{E2eError, E2eResult};
use crate::selectors::{CODE_INPUT, DASHBOARD_HEADING, ERROR_NOTIFICATION, LOGIN_BUTTON, LOGIN_INPUT, PASSWORD_INPUT};
use crate::session::Session;

/// Why the login form refused the credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    InvalidCredentials,
    UserBlocked,
    Other,
}

impl RejectionReason {
    /// Classify banner text against the configured messages
    pub fn classify(message: &str, texts: &UiTexts) -> Self {
        let message = message.to_lowercase();
        if message.contains(&texts.user_blocked.to_lowercase()) {
            RejectionReason::UserBlocked
        } else if message.contains(&texts.invalid_credentials.to_lowercase()) {
            RejectionReason::InvalidCredentials
        } else {
            RejectionReason::Other
        }
    }
}

/// Where a credential submission led
pub enum LoginOutcome {
    Authenticated(DashboardPage),
    AwaitingVerification(VerificationPage),
    /// The form is still shown and can be retried
    Rejected {
        page: LoginPage,
        notification: ErrorNotification,
        reason: RejectionReason,
    },
}

impl LoginOutcome {
    /// The application accepted the credentials (with or without a second step)
    pub fn is_accepted(&self) -> bool {
        !matches!(self, LoginOutcome::Rejected { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            LoginOutcome::Authenticated(_) => "dashboard".to_string(),
            LoginOutcome::AwaitingVerification(_) => "verification prompt".to_string(),
            LoginOutcome::Rejected { notification, .. } => {
                format!("rejected: '{}'", notification.message)
            }
        }
    }
}

pub struct LoginPage {
    session: Session,
}

impl LoginPage {
    pub(crate) async fn new(session: Session) -> E2eResult<Self> {
        session.locator().find(LOGIN_INPUT).await?;
        Ok(Self { session })
    }

    /// Fill both fields, submit, and wait for whichever page answers
    pub async fn submit_credentials(self, credentials: &Credentials) -> E2eResult<LoginOutcome> {
        let locator = self.session.locator();
        locator.find(LOGIN_INPUT).await?.fill(&credentials.login).await?;
        locator.find(PASSWORD_INPUT).await?.fill(&credentials.password).await?;
        locator.find(LOGIN_BUTTON).await?.click().await?;
        debug!("Submitted credentials for '{}'", credentials.login);

        let (which, element) = locator
            .first_of(&[DASHBOARD_HEADING, CODE_INPUT, ERROR_NOTIFICATION])
            .await?;

        let outcome = match which {
            0 => LoginOutcome::Authenticated(DashboardPage::new(self.session.clone()).await?),
            1 => LoginOutcome::AwaitingVerification(VerificationPage::new(self.session.clone()).await?),
            _ => {
                let notification = ErrorNotification::visible(element.text());
                let reason = RejectionReason::classify(&notification.message, &self.session.config().texts);
                LoginOutcome::Rejected {
                    page: self,
                    notification,
                    reason,
                }
            }
        };
        info!("Login as '{}': {}", credentials.login, outcome.describe());
        Ok(outcome)
    }

    /// Login for the two-step flow: anything but the verification prompt fails
    pub async fn valid_login(self, auth: &AuthInfo) -> E2eResult<VerificationPage> {
        match self.submit_credentials(auth).await? {
            LoginOutcome::AwaitingVerification(page) => Ok(page),
            other => Err(E2eError::assertion(format!(
                "expected verification prompt for '{}', got {}",
                auth.login,
                other.describe()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Ошибка! Неверно указан логин или пароль", RejectionReason::InvalidCredentials)]
    #[test_case("Ошибка! Пользователь заблокирован", RejectionReason::UserBlocked)]
    #[test_case("ОШИБКА! ПОЛЬЗОВАТЕЛЬ ЗАБЛОКИРОВАН", RejectionReason::UserBlocked)]
    #[test_case("Сервис недоступен", RejectionReason::Other)]
    fn test_classify_rejection(message: &str, expected: RejectionReason) {
        assert_eq!(RejectionReason::classify(message, &UiTexts::default()), expected);
    }
}
