use futures::future::FutureExt;
use ibank_common::{BalanceSnapshot, CardInfo, ErrorNotification, TransferRequest};
use tracing::{info, warn};

use super::{Scenario, ScenarioContext};
use crate::error::{E2eError, E2eResult};
use crate::pages::TransferOutcome;
use crate::{ensure, ensure_eq};

const OVERDRAFT_ISSUE: &str = "transfers above the card balance are accepted";
const SAME_CARD_ISSUE: &str = "a card can transfer to itself without an error";
const ZERO_AMOUNT_ISSUE: &str = "zero transfers complete without an error";

#[derive(Debug, Clone, Copy)]
enum Direction {
    FirstToSecond,
    SecondToFirst,
    FirstToFirst,
    SecondToSecond,
}

impl Direction {
    /// (source, target)
    fn cards(self, ctx: &ScenarioContext) -> (CardInfo, CardInfo) {
        let fixtures = ctx.fixtures();
        let (first, second) = (fixtures.first_card().clone(), fixtures.second_card().clone());
        match self {
            Direction::FirstToSecond => (first, second),
            Direction::SecondToFirst => (second, first),
            Direction::FirstToFirst => (first.clone(), first),
            Direction::SecondToSecond => (second.clone(), second),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Amount {
    Random,
    FullBalance,
    OverBalance,
    Zero,
    Fixed(i64),
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "transfer_random_first_to_second",
            description: "A random amount within the balance moves from the first card to the second",
            tags: &["transfer", "smoke"],
            known_issue: None,
            body: |ctx| accepted(ctx, Direction::FirstToSecond, Amount::Random).boxed(),
        },
        Scenario {
            name: "transfer_random_second_to_first",
            description: "A random amount within the balance moves from the second card to the first",
            tags: &["transfer"],
            known_issue: None,
            body: |ctx| accepted(ctx, Direction::SecondToFirst, Amount::Random).boxed(),
        },
        Scenario {
            name: "transfer_full_balance_first_to_second",
            description: "The whole first card balance moves to the second card",
            tags: &["transfer"],
            known_issue: None,
            body: |ctx| accepted(ctx, Direction::FirstToSecond, Amount::FullBalance).boxed(),
        },
        Scenario {
            name: "transfer_full_balance_second_to_first",
            description: "The whole second card balance moves to the first card",
            tags: &["transfer"],
            known_issue: None,
            body: |ctx| accepted(ctx, Direction::SecondToFirst, Amount::FullBalance).boxed(),
        },
        Scenario {
            name: "transfer_over_balance_first_to_second",
            description: "More than the first card holds is refused and nothing moves",
            tags: &["transfer", "negative"],
            known_issue: Some(OVERDRAFT_ISSUE),
            body: |ctx| refused(ctx, Direction::FirstToSecond, Amount::OverBalance).boxed(),
        },
        Scenario {
            name: "transfer_over_balance_second_to_first",
            description: "More than the second card holds is refused and nothing moves",
            tags: &["transfer", "negative"],
            known_issue: Some(OVERDRAFT_ISSUE),
            body: |ctx| refused(ctx, Direction::SecondToFirst, Amount::OverBalance).boxed(),
        },
        Scenario {
            name: "transfer_same_card_first",
            description: "The first card cannot transfer to itself",
            tags: &["transfer", "negative"],
            known_issue: Some(SAME_CARD_ISSUE),
            body: |ctx| refused(ctx, Direction::FirstToFirst, Amount::Fixed(10)).boxed(),
        },
        Scenario {
            name: "transfer_same_card_second",
            description: "The second card cannot transfer to itself",
            tags: &["transfer", "negative"],
            known_issue: Some(SAME_CARD_ISSUE),
            body: |ctx| refused(ctx, Direction::SecondToSecond, Amount::Fixed(10)).boxed(),
        },
        Scenario {
            name: "transfer_zero_first_to_second",
            description: "A zero transfer from the first card is refused",
            tags: &["transfer", "negative"],
            known_issue: Some(ZERO_AMOUNT_ISSUE),
            body: |ctx| refused(ctx, Direction::FirstToSecond, Amount::Zero).boxed(),
        },
        Scenario {
            name: "transfer_zero_second_to_first",
            description: "A zero transfer from the second card is refused",
            tags: &["transfer", "negative"],
            known_issue: Some(ZERO_AMOUNT_ISSUE),
            body: |ctx| refused(ctx, Direction::SecondToFirst, Amount::Zero).boxed(),
        },
    ]
}

/// Both fixture cards, in fixture order
fn both_cards(ctx: &ScenarioContext) -> [CardInfo; 2] {
    let fixtures = ctx.fixtures();
    [fixtures.first_card().clone(), fixtures.second_card().clone()]
}

/// A transfer the application must carry out exactly
async fn accepted(mut ctx: ScenarioContext, direction: Direction, amount: Amount) -> E2eResult<()> {
    let (source, target) = direction.cards(&ctx);
    let cards = both_cards(&ctx);

    let dashboard = ctx.login_to_dashboard().await?;
    let before = dashboard.balances(&cards).await?;
    let source_balance = before
        .get(&source)
        .ok_or_else(|| E2eError::assertion(format!("no balance read for {}", source)))?;

    let amount = match amount {
        Amount::Random => ctx.generator.valid_amount(source_balance),
        Amount::FullBalance => source_balance.amount(),
        other => {
            return Err(E2eError::assertion(format!(
                "{:?} is not an amount the application accepts",
                other
            )))
        }
    };
    ensure!(amount > 0, "{} has nothing to transfer ({})", source, source_balance);

    let dashboard = dashboard
        .select_card_to_transfer(&target)
        .await?
        .make_valid_transfer(&amount.to_string(), &source)
        .await?;
    let after = dashboard.balances(&cards).await?;

    let expected = before.after_transfer(&source, &target, amount);
    let mismatches = expected.mismatches(&after);
    ensure!(
        mismatches.is_empty(),
        "after moving {} from {} to {}: {}",
        amount,
        source,
        target,
        mismatches.join("; ")
    );
    ensure_eq!(after.total(), before.total(), "total across cards");
    info!("Moved {} from {} to {}", amount, source, target);
    Ok(())
}

/// A transfer the application must refuse with an error banner, leaving
/// every balance where it was.
///
/// Only a wrong answer to the submitted transfer is an `ApplicationDefect`;
/// anything that breaks before or while reading the answer stays a plain
/// failure.
async fn refused(mut ctx: ScenarioContext, direction: Direction, amount: Amount) -> E2eResult<()> {
    let (source, target) = direction.cards(&ctx);
    let cards = both_cards(&ctx);
    let expected_banner = ctx.config().texts.transfer_error.clone();

    let dashboard = ctx.login_to_dashboard().await?;
    let before = dashboard.balances(&cards).await?;
    let source_balance = before
        .get(&source)
        .ok_or_else(|| E2eError::assertion(format!("no balance read for {}", source)))?;

    let amount = match amount {
        Amount::OverBalance => ctx.generator.invalid_amount(source_balance),
        Amount::Zero => 0,
        Amount::Fixed(value) => value,
        other => {
            return Err(E2eError::assertion(format!(
                "{:?} is not an amount the application refuses",
                other
            )))
        }
    };
    let request = TransferRequest::new(amount, source.clone(), target.clone());
    info!("Attempting {:?} transfer of {} from {} to {}", request.classify(source_balance), amount, source, target);

    let outcome = dashboard.transfer(&request).await?;
    let completed = outcome.is_completed();
    let banner = match &outcome {
        TransferOutcome::Rejected {
            notification: Some(n), ..
        } => Some(n.clone()),
        _ => None,
    };
    match &banner {
        Some(n) => info!("Application answered '{}'", n.message),
        None if completed => warn!("Application accepted the transfer"),
        None => warn!("Application neither completed the transfer nor showed an error"),
    }

    let dashboard = outcome.into_dashboard().await?;
    let after = dashboard.balances(&cards).await?;

    check_refusal(&request, &before, &after, completed, banner, &expected_banner).map_err(E2eError::into_defect)
}

/// Balances first, then the transfer must not have completed, then a banner
/// naming the error must have been shown
fn check_refusal(
    request: &TransferRequest,
    before: &BalanceSnapshot,
    after: &BalanceSnapshot,
    completed: bool,
    banner: Option<ErrorNotification>,
    expected_banner: &str,
) -> E2eResult<()> {
    let (amount, source, target) = (&request.amount, &request.source, &request.target);
    let mismatches = before.mismatches(after);
    ensure!(
        mismatches.is_empty(),
        "refused transfer of {} from {} to {} changed balances: {}",
        amount,
        source,
        target,
        mismatches.join("; ")
    );

    ensure!(!completed, "transfer of {} from {} to {} was accepted", amount, source, target);
    match banner {
        Some(n) => {
            ensure!(
                n.contains(expected_banner),
                "error notification '{}' does not mention '{}'",
                n.message,
                expected_banner
            );
            Ok(())
        }
        None => Err(E2eError::assertion(format!(
            "no error notification for a transfer of {} from {} to {}",
            amount, source, target
        ))),
    }
}
