use ibank_common::VerificationCode;
use tracing::info;

use super::DashboardPage;
use crate::error::{E2eError, E2eResult};
use crate::selectors::{CODE_INPUT, DASHBOARD_HEADING, ERROR_NOTIFICATION, VERIFY_BUTTON};
use crate::session::Session;

/// Second login step: one-time code prompt
pub struct VerificationPage {
    session: Session,
}

impl VerificationPage {
    pub(crate) async fn new(session: Session) -> E2eResult<Self> {
        session.locator().find(CODE_INPUT).await?;
        Ok(Self { session })
    }

    pub async fn verify(self, code: &VerificationCode) -> E2eResult<DashboardPage> {
        let locator = self.session.locator();
        locator.find(CODE_INPUT).await?.fill(code.as_str()).await?;
        locator.find(VERIFY_BUTTON).await?.click().await?;

        let (which, element) = locator.first_of(&[DASHBOARD_HEADING, ERROR_NOTIFICATION]).await?;
        if which == 1 {
            return Err(E2eError::VerificationRejected(element.text().to_string()));
        }
        info!("Verification accepted");
        DashboardPage::new(self.session).await
    }
}
