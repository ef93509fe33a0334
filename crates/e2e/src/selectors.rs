//! DOM selectors shared by the harness and the application under test

pub const LOGIN_INPUT: &str = "[data-test-id='login'] input";
pub const PASSWORD_INPUT: &str = "[data-test-id='password'] input";
pub const LOGIN_BUTTON: &str = "[data-test-id='action-login']";

pub const CODE_INPUT: &str = "[data-test-id='code'] input";
pub const VERIFY_BUTTON: &str = "[data-test-id='action-verify']";

pub const DASHBOARD_HEADING: &str = "[data-test-id='dashboard']";

/// One match per card tile; each carries `CARD_ID_ATTRIBUTE`
pub const CARD_TILES: &str = ".list__item div";
pub const CARD_ID_ATTRIBUTE: &str = "data-test-id";
/// Transfer control inside a tile
pub const TILE_BUTTON: &str = "button";

pub const AMOUNT_INPUT: &str = "[data-test-id='amount'] input";
pub const FROM_INPUT: &str = "[data-test-id='from'] input";
pub const TRANSFER_BUTTON: &str = "[data-test-id='action-transfer']";
pub const CANCEL_BUTTON: &str = "[data-test-id='action-cancel']";

pub const ERROR_NOTIFICATION: &str = "[data-test-id='error-notification']";
