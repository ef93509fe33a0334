use ibank_common::{Balance, BalanceSnapshot, CardInfo, TransferRequest};
use tracing::{debug, info};

use super::{TransferOutcome, TransferPage};
use crate::error::E2eResult;
use crate::locator::Predicate;
use crate::selectors::{CARD_ID_ATTRIBUTE, CARD_TILES, DASHBOARD_HEADING, TILE_BUTTON};
use crate::session::Session;

/// Tiles show only the last four digits, behind this mask
const CARD_MASK: &str = "**** ";

/// Card list with balances
pub struct DashboardPage {
    session: Session,
}

impl DashboardPage {
    /// Fails unless the dashboard heading becomes visible, so no balance is
    /// ever read from a page that has not rendered yet.
    pub(crate) async fn new(session: Session) -> E2eResult<Self> {
        session.locator().find(DASHBOARD_HEADING).await?;
        Ok(Self { session })
    }

    /// Balance of the tile showing the card's last digits.
    ///
    /// The digits are matched right after the mask so a balance that happens
    /// to contain them cannot select the wrong tile.
    pub async fn card_balance(&self, card: &CardInfo) -> E2eResult<Balance> {
        let masked = format!("{}{}", CARD_MASK, card.last_digits());
        let tile = self
            .session
            .locator()
            .find_by(CARD_TILES, &Predicate::text(masked))
            .await?;
        let balance = Balance::parse(tile.text(), &self.session.config().texts.balance)?;
        debug!("{} balance: {}", card, balance);
        Ok(balance)
    }

    /// Balances of several cards, read one after another
    pub async fn balances(&self, cards: &[CardInfo]) -> E2eResult<BalanceSnapshot> {
        let mut snapshot = BalanceSnapshot::new();
        for card in cards {
            let balance = self.card_balance(card).await?;
            snapshot.insert(card.clone(), balance);
        }
        Ok(snapshot)
    }

    /// Open the transfer form that credits `card`
    pub async fn select_card_to_transfer(self, card: &CardInfo) -> E2eResult<TransferPage> {
        let tile = self
            .session
            .locator()
            .find_by(CARD_TILES, &Predicate::attribute(CARD_ID_ATTRIBUTE, &card.test_id))
            .await?;
        tile.click_child(TILE_BUTTON).await?;
        info!("Transfer to {}", card);
        TransferPage::new(self.session).await
    }

    /// Select the target, submit the request, and report what happened
    pub async fn transfer(self, request: &TransferRequest) -> E2eResult<TransferOutcome> {
        let page = self.select_card_to_transfer(&request.target).await?;
        page.make_transfer(&request.amount, &request.source).await?;
        page.settle().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HarnessConfig, WaitConfig};
    use crate::driver::{Driver, ElementRef, ElementSnapshot};
    use crate::error::E2eError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    /// Renders card tiles but never the dashboard heading
    #[derive(Default)]
    struct HeadlessDashboard {
        queried: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Driver for HeadlessDashboard {
        async fn navigate(&self, _url: &str) -> E2eResult<()> {
            Ok(())
        }

        async fn query(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>> {
            self.queried.lock().push(selector.to_string());
            if selector != CARD_TILES {
                return Ok(Vec::new());
            }
            Ok(vec![ElementSnapshot {
                index: 0,
                text: "**** **** **** 0001, баланс: 10000 р.".to_string(),
                visible: true,
                attributes: HashMap::new(),
            }])
        }

        async fn fill(&self, _target: &ElementRef, _value: &str) -> E2eResult<()> {
            Ok(())
        }

        async fn click(&self, _target: &ElementRef) -> E2eResult<()> {
            Ok(())
        }

        async fn screenshot(&self, _path: &Path) -> E2eResult<()> {
            Ok(())
        }

        async fn close(&self) -> E2eResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_no_dashboard_without_heading() {
        let driver = Arc::new(HeadlessDashboard::default());
        let config = HarnessConfig {
            wait: WaitConfig {
                timeout_ms: 50,
                interval_ms: 5,
            },
            ..Default::default()
        };
        let session = Session::new(driver.clone(), Arc::new(config));

        let err = DashboardPage::new(session).await.err().unwrap();
        assert!(
            matches!(err, E2eError::ElementNotFound { .. } | E2eError::Timeout { .. }),
            "{:?}",
            err
        );

        // Tiles were on the page, but no balance was ever read from them
        let queried = driver.queried.lock();
        assert!(!queried.is_empty());
        assert!(queried.iter().all(|s| s == DASHBOARD_HEADING));
    }
}
