use ibank_common::{CardInfo, ErrorNotification};
use tracing::{debug, info, warn};

use super::DashboardPage;
use crate::error::{E2eError, E2eResult};
use crate::selectors::{AMOUNT_INPUT, CANCEL_BUTTON, DASHBOARD_HEADING, ERROR_NOTIFICATION, FROM_INPUT, TRANSFER_BUTTON};
use crate::session::Session;
use crate::wait::Probe;

/// What the application did with a submitted transfer
pub enum TransferOutcome {
    /// Back on the dashboard
    Completed(DashboardPage),
    /// Still on the form; the banner is `None` when the application
    /// neither moved on nor said anything within the wait
    Rejected {
        page: TransferPage,
        notification: Option<ErrorNotification>,
    },
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed(_))
    }

    /// The dashboard, leaving the form through its cancel control if needed
    pub async fn into_dashboard(self) -> E2eResult<DashboardPage> {
        match self {
            TransferOutcome::Completed(dashboard) => Ok(dashboard),
            TransferOutcome::Rejected { page, .. } => page.cancel().await,
        }
    }
}

enum Settled {
    Dashboard,
    Banner(String),
}

/// Transfer form for one target card
pub struct TransferPage {
    session: Session,
}

impl TransferPage {
    pub(crate) async fn new(session: Session) -> E2eResult<Self> {
        session.locator().find(AMOUNT_INPUT).await?;
        Ok(Self { session })
    }

    /// Fill the form and submit without waiting for any outcome
    pub async fn make_transfer(&self, amount: &str, source: &CardInfo) -> E2eResult<()> {
        let locator = self.session.locator();
        locator.find(AMOUNT_INPUT).await?.fill(amount).await?;
        locator.find(FROM_INPUT).await?.fill(&source.number).await?;
        locator.find(TRANSFER_BUTTON).await?.click().await?;
        info!("Submitted transfer of {} from {}", amount, source);
        Ok(())
    }

    /// Submit and require the dashboard to come back
    pub async fn make_valid_transfer(self, amount: &str, source: &CardInfo) -> E2eResult<DashboardPage> {
        self.make_transfer(amount, source).await?;
        match self.settle().await? {
            TransferOutcome::Completed(dashboard) => Ok(dashboard),
            TransferOutcome::Rejected { notification, .. } => Err(E2eError::assertion(format!(
                "transfer of {} from {} was not accepted: {}",
                amount,
                source,
                notification
                    .map(|n| n.message)
                    .unwrap_or_else(|| "form still shown, no notification".to_string())
            ))),
        }
    }

    /// Wait for the application to answer a submission.
    ///
    /// A banner wins over navigation; a timeout is not an error here, it is
    /// reported as `Rejected` without a notification.
    pub async fn settle(self) -> E2eResult<TransferOutcome> {
        let locator = self.session.locator();
        let probe = &locator;
        let settled = locator
            .policy()
            .until("transfer outcome", move || async move {
                if let Some(banner) = probe.visible(ERROR_NOTIFICATION).await?.into_iter().next() {
                    return Ok(Probe::Ready(Settled::Banner(banner.text)));
                }
                if !probe.is_visible(AMOUNT_INPUT).await? && probe.is_visible(DASHBOARD_HEADING).await? {
                    return Ok(Probe::Ready(Settled::Dashboard));
                }
                Ok(Probe::Pending("transfer form still shown".to_string()))
            })
            .await;

        match settled {
            Ok(Settled::Dashboard) => Ok(TransferOutcome::Completed(DashboardPage::new(self.session).await?)),
            Ok(Settled::Banner(text)) => {
                debug!("Transfer rejected with '{}'", text);
                Ok(TransferOutcome::Rejected {
                    page: self,
                    notification: Some(ErrorNotification::visible(text)),
                })
            }
            Err(E2eError::Timeout { waited_ms, .. }) => {
                warn!("Transfer neither completed nor reported an error within {} ms", waited_ms);
                Ok(TransferOutcome::Rejected {
                    page: self,
                    notification: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Banner shown right now, if any
    pub async fn error_notification(&self) -> E2eResult<Option<ErrorNotification>> {
        let visible = self.session.locator().visible(ERROR_NOTIFICATION).await?;
        Ok(visible.into_iter().next().map(|b| ErrorNotification::visible(b.text)))
    }

    /// Require a visible banner containing `expected` (case-insensitive)
    pub async fn find_error_message(&self, expected: &str) -> E2eResult<()> {
        let locator = self.session.locator();
        let probe = &locator;
        let found = locator
            .policy()
            .until(ERROR_NOTIFICATION, move || async move {
                Ok(match probe.visible(ERROR_NOTIFICATION).await?.into_iter().next() {
                    Some(b) if ErrorNotification::visible(b.text.clone()).contains(expected) => Probe::Ready(()),
                    Some(b) => Probe::Pending(format!("banner says '{}'", b.text)),
                    None => Probe::Missing,
                })
            })
            .await;

        match found {
            Ok(()) => Ok(()),
            Err(E2eError::ElementNotFound { .. }) => Err(E2eError::assertion(format!(
                "expected an error notification containing '{}', none shown",
                expected
            ))),
            Err(E2eError::Timeout { detail, .. }) => Err(E2eError::assertion(format!(
                "expected an error notification containing '{}', {}",
                expected, detail
            ))),
            Err(e) => Err(e),
        }
    }

    /// Leave the form without transferring
    pub async fn cancel(self) -> E2eResult<DashboardPage> {
        let locator = self.session.locator();
        locator.find(CANCEL_BUTTON).await?.click().await?;
        locator.wait_gone(AMOUNT_INPUT).await?;
        DashboardPage::new(self.session).await
    }
}
