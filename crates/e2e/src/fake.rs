//! In-memory stand-in for the ibank application
//!
//! [`FakeBank`] holds the server side (users, cards, balances) and hands out
//! [`FakeBrowser`] sessions that render the same selectors as the real UI.
//! Screen changes can lag behind a click by a number of queries to exercise
//! the polling paths, and known application defects can be switched on.

use async_trait::async_trait;
use ibank_common::{AccountStatus, BalanceMarkers, CardInfo, Credentials, Fixtures, RegisteredUser, VerificationCode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::driver::{Driver, ElementRef, ElementSnapshot};
use crate::error::{E2eError, E2eResult};
use crate::registration::UserRegistry;
use crate::selectors::*;
use crate::session::SessionFactory;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Ошибка! Неверно указан логин или пароль";
pub const USER_BLOCKED_MESSAGE: &str = "Ошибка! Пользователь заблокирован";
pub const INVALID_CODE_MESSAGE: &str = "Ошибка! Неверно указан код! Попробуйте ещё раз.";
pub const TRANSFER_FAILED_MESSAGE: &str = "Ошибка! Произошла ошибка";

const DASHBOARD_TITLE: &str = "Личный кабинет";
const STARTING_BALANCE: i64 = 10_000;

/// Application bugs the fake can reproduce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Defects {
    /// Transfers above the source balance go through
    pub allow_overdraft: bool,
    /// Zero transfers "succeed"
    pub allow_zero_amount: bool,
    /// A card can transfer to itself
    pub allow_same_card: bool,
    /// Rejected transfers show no banner
    pub silent_rejections: bool,
}

#[derive(Debug, Clone)]
pub struct FakeBankOptions {
    /// Login goes through the one-time code page
    pub two_factor: bool,
    /// Queries that pass before a clicked action renders
    pub render_delay: u32,
    pub defects: Defects,
    pub markers: BalanceMarkers,
}

impl Default for FakeBankOptions {
    fn default() -> Self {
        Self {
            two_factor: true,
            render_delay: 2,
            defects: Defects::default(),
            markers: BalanceMarkers::default(),
        }
    }
}

struct Backend {
    users: HashMap<String, RegisteredUser>,
    owner: Credentials,
    code: VerificationCode,
    cards: Vec<(CardInfo, i64)>,
    sessions_opened: usize,
}

impl Backend {
    fn card_index(&self, card: &CardInfo) -> Option<usize> {
        self.cards.iter().position(|(c, _)| c.same_card(card))
    }
}

/// Server side of the fake application
#[derive(Clone)]
pub struct FakeBank {
    backend: Arc<Mutex<Backend>>,
    options: FakeBankOptions,
}

impl FakeBank {
    /// The fixture owner is registered as active and every card starts at 10000
    pub fn new(fixtures: &Fixtures, options: FakeBankOptions) -> Self {
        let owner = fixtures.auth.clone();
        let mut users = HashMap::new();
        users.insert(
            owner.login.clone(),
            RegisteredUser {
                login: owner.login.clone(),
                password: owner.password.clone(),
                status: AccountStatus::Active,
            },
        );
        let backend = Backend {
            users,
            owner,
            code: fixtures.verification_code.clone(),
            cards: fixtures.cards.iter().map(|c| (c.clone(), STARTING_BALANCE)).collect(),
            sessions_opened: 0,
        };
        Self {
            backend: Arc::new(Mutex::new(backend)),
            options,
        }
    }

    /// Set balances in fixture card order
    pub fn with_balances(self, balances: &[i64]) -> Self {
        {
            let mut backend = self.backend.lock();
            for ((_, balance), value) in backend.cards.iter_mut().zip(balances) {
                *balance = *value;
            }
        }
        self
    }

    pub fn set_balance(&self, card: &CardInfo, amount: i64) {
        let mut backend = self.backend.lock();
        if let Some(i) = backend.card_index(card) {
            backend.cards[i].1 = amount;
        }
    }

    pub fn balance(&self, card: &CardInfo) -> Option<i64> {
        let backend = self.backend.lock();
        backend.card_index(card).map(|i| backend.cards[i].1)
    }

    pub fn total(&self) -> i64 {
        self.backend.lock().cards.iter().map(|(_, b)| b).sum()
    }

    pub fn sessions_opened(&self) -> usize {
        self.backend.lock().sessions_opened
    }

    /// A fresh browser on a blank page
    pub fn browser(&self) -> FakeBrowser {
        self.backend.lock().sessions_opened += 1;
        FakeBrowser {
            backend: self.backend.clone(),
            options: self.options.clone(),
            page: Mutex::new(PageState::default()),
        }
    }
}

#[async_trait]
impl SessionFactory for FakeBank {
    async fn launch(&self) -> E2eResult<Arc<dyn Driver>> {
        Ok(Arc::new(self.browser()))
    }
}

#[async_trait]
impl UserRegistry for FakeBank {
    async fn register(&self, user: &RegisteredUser) -> E2eResult<()> {
        self.backend.lock().users.insert(user.login.clone(), user.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Blank,
    Login,
    Verification,
    Dashboard,
    Transfer { target: usize },
}

struct Transition {
    screen: Screen,
    notification: Option<String>,
}

#[derive(Default)]
struct PageState {
    screen: Screen,
    pending: Option<(u32, Transition)>,
    inputs: HashMap<String, String>,
    notification: Option<String>,
    user: Option<String>,
    closed: bool,
}

impl PageState {
    fn apply(&mut self, t: Transition) {
        if t.screen != self.screen {
            self.inputs.clear();
        }
        self.screen = t.screen;
        self.notification = t.notification;
    }

    fn tick(&mut self) {
        if let Some((remaining, _)) = self.pending.as_mut() {
            if *remaining > 1 {
                *remaining -= 1;
                return;
            }
        }
        if let Some((_, t)) = self.pending.take() {
            self.apply(t);
        }
    }

    fn input(&self, selector: &str) -> String {
        self.inputs.get(selector).cloned().unwrap_or_default()
    }
}

/// One browser session against a [`FakeBank`]
pub struct FakeBrowser {
    backend: Arc<Mutex<Backend>>,
    options: FakeBankOptions,
    page: Mutex<PageState>,
}

impl FakeBrowser {
    pub fn screen(&self) -> Screen {
        self.page.lock().screen
    }

    fn render(&self, page: &PageState, selector: &str) -> Vec<ElementSnapshot> {
        let screen = page.screen;
        let single = |visible: bool, text: &str| vec![snapshot(0, text, visible)];
        match selector {
            LOGIN_INPUT | PASSWORD_INPUT => single(screen == Screen::Login, &page.input(selector)),
            LOGIN_BUTTON => single(screen == Screen::Login, "Продолжить"),
            CODE_INPUT => single(screen == Screen::Verification, &page.input(selector)),
            VERIFY_BUTTON => single(screen == Screen::Verification, "Продолжить"),
            DASHBOARD_HEADING => match screen {
                Screen::Dashboard | Screen::Transfer { .. } => single(true, DASHBOARD_TITLE),
                _ => Vec::new(),
            },
            CARD_TILES => self.tiles(page),
            AMOUNT_INPUT | FROM_INPUT => single(matches!(screen, Screen::Transfer { .. }), &page.input(selector)),
            TRANSFER_BUTTON => single(matches!(screen, Screen::Transfer { .. }), "Пополнить"),
            CANCEL_BUTTON => single(matches!(screen, Screen::Transfer { .. }), "Отмена"),
            ERROR_NOTIFICATION => match (&page.notification, screen) {
                (_, Screen::Blank) => Vec::new(),
                (Some(message), _) => single(true, message),
                (None, _) => single(false, ""),
            },
            _ => Vec::new(),
        }
    }

    /// Tiles exist on the dashboard and stay in the DOM, hidden, behind the
    /// transfer form. Only the fixture owner has cards.
    fn tiles(&self, page: &PageState) -> Vec<ElementSnapshot> {
        let visible = match page.screen {
            Screen::Dashboard => true,
            Screen::Transfer { .. } => false,
            _ => return Vec::new(),
        };
        let backend = self.backend.lock();
        if page.user.as_deref() != Some(backend.owner.login.as_str()) {
            return Vec::new();
        }
        let markers = &self.options.markers;
        backend
            .cards
            .iter()
            .enumerate()
            .map(|(i, (card, balance))| {
                let text = format!(
                    "**** **** **** {}, {}{}{}\nПополнить",
                    card.last_digits(),
                    markers.prefix,
                    balance,
                    markers.suffix
                );
                let mut el = snapshot(i, &text, visible);
                el.attributes.insert(CARD_ID_ATTRIBUTE.to_string(), card.test_id.clone());
                el
            })
            .collect()
    }

    fn schedule(&self, page: &mut PageState, transition: Transition) {
        if self.options.render_delay == 0 {
            page.apply(transition);
        } else {
            page.pending = Some((self.options.render_delay, transition));
        }
    }

    fn submit_login(&self, page: &mut PageState) -> Transition {
        let login = page.input(LOGIN_INPUT);
        let password = page.input(PASSWORD_INPUT);
        let backend = self.backend.lock();

        let rejected = |message: &str| Transition {
            screen: Screen::Login,
            notification: Some(message.to_string()),
        };
        match backend.users.get(&login) {
            Some(user) if user.password == password => match user.status {
                AccountStatus::Blocked => rejected(USER_BLOCKED_MESSAGE),
                AccountStatus::Active => {
                    page.user = Some(login);
                    Transition {
                        screen: if self.options.two_factor {
                            Screen::Verification
                        } else {
                            Screen::Dashboard
                        },
                        notification: None,
                    }
                }
            },
            _ => rejected(INVALID_CREDENTIALS_MESSAGE),
        }
    }

    fn submit_code(&self, page: &PageState) -> Transition {
        if page.input(CODE_INPUT) == self.backend.lock().code.as_str() {
            Transition {
                screen: Screen::Dashboard,
                notification: None,
            }
        } else {
            Transition {
                screen: Screen::Verification,
                notification: Some(INVALID_CODE_MESSAGE.to_string()),
            }
        }
    }

    fn submit_transfer(&self, page: &PageState, target: usize) -> Transition {
        let defects = self.options.defects;
        let stay = Transition {
            screen: page.screen,
            notification: (!defects.silent_rejections).then(|| TRANSFER_FAILED_MESSAGE.to_string()),
        };

        let amount_text = page.input(AMOUNT_INPUT);
        let from_digits: String = page.input(FROM_INPUT).chars().filter(|c| c.is_ascii_digit()).collect();
        let mut backend = self.backend.lock();

        let Ok(amount) = amount_text.trim().parse::<i64>() else {
            return stay;
        };
        let source = backend.cards.iter().position(|(c, _)| {
            c.number.chars().filter(|ch| ch.is_ascii_digit()).collect::<String>() == from_digits
        });
        let Some(source) = source else {
            return stay;
        };

        let available = backend.cards[source].1;
        let refused = amount < 0
            || (source == target && !defects.allow_same_card)
            || (amount == 0 && !defects.allow_zero_amount)
            || (amount > available && !defects.allow_overdraft);
        if refused {
            debug!("Fake bank refused transfer of {} from card {}", amount, source);
            return stay;
        }

        backend.cards[source].1 -= amount;
        backend.cards[target].1 += amount;
        Transition {
            screen: Screen::Dashboard,
            notification: None,
        }
    }

    fn ensure_open(page: &PageState) -> E2eResult<()> {
        if page.closed {
            Err(E2eError::Driver("session closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn ensure_visible(&self, page: &PageState, target: &ElementRef) -> E2eResult<()> {
        let visible = self
            .render(page, &target.selector)
            .into_iter()
            .any(|e| e.index == target.index && e.visible);
        if visible {
            Ok(())
        } else {
            Err(E2eError::Driver(format!("element not interactable: {}", target)))
        }
    }
}

fn snapshot(index: usize, text: &str, visible: bool) -> ElementSnapshot {
    ElementSnapshot {
        index,
        text: text.to_string(),
        visible,
        attributes: HashMap::new(),
    }
}

#[async_trait]
impl Driver for FakeBrowser {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        let mut page = self.page.lock();
        Self::ensure_open(&page)?;
        debug!("Fake navigate {}", url);
        *page = PageState {
            screen: Screen::Login,
            ..Default::default()
        };
        Ok(())
    }

    async fn query(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>> {
        let mut page = self.page.lock();
        Self::ensure_open(&page)?;
        page.tick();
        Ok(self.render(&page, selector))
    }

    async fn fill(&self, target: &ElementRef, value: &str) -> E2eResult<()> {
        let mut page = self.page.lock();
        Self::ensure_open(&page)?;
        self.ensure_visible(&page, target)?;
        match target.selector.as_str() {
            LOGIN_INPUT | PASSWORD_INPUT | CODE_INPUT | AMOUNT_INPUT | FROM_INPUT => {
                page.inputs.insert(target.selector.clone(), value.to_string());
                Ok(())
            }
            other => Err(E2eError::Driver(format!("cannot fill {}", other))),
        }
    }

    async fn click(&self, target: &ElementRef) -> E2eResult<()> {
        let mut page = self.page.lock();
        Self::ensure_open(&page)?;
        self.ensure_visible(&page, target)?;

        let transition = match (target.selector.as_str(), target.descendant.as_deref(), page.screen) {
            (LOGIN_BUTTON, None, Screen::Login) => {
                page.notification = None;
                self.submit_login(&mut page)
            }
            (VERIFY_BUTTON, None, Screen::Verification) => {
                page.notification = None;
                self.submit_code(&page)
            }
            (CARD_TILES, Some(TILE_BUTTON), Screen::Dashboard) => Transition {
                screen: Screen::Transfer { target: target.index },
                notification: None,
            },
            (TRANSFER_BUTTON, None, Screen::Transfer { target: credited }) => {
                page.notification = None;
                self.submit_transfer(&page, credited)
            }
            (CANCEL_BUTTON, None, Screen::Transfer { .. }) => Transition {
                screen: Screen::Dashboard,
                notification: None,
            },
            _ => return Err(E2eError::Driver(format!("nothing happens on click at {}", target))),
        };
        self.schedule(&mut page, transition);
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        let page = self.page.lock();
        let mut dump = format!("screen: {:?}\n", page.screen);
        if let Some(message) = &page.notification {
            dump.push_str(&format!("notification: {}\n", message));
        }
        let mut inputs: Vec<_> = page.inputs.iter().collect();
        inputs.sort();
        for (selector, value) in inputs {
            dump.push_str(&format!("{} = {}\n", selector, value));
        }
        std::fs::write(path, dump)?;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        self.page.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(delay: u32) -> FakeBank {
        FakeBank::new(
            &Fixtures::default(),
            FakeBankOptions {
                render_delay: delay,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_login_renders_after_delay() {
        let fixtures = Fixtures::default();
        let browser = bank(2).browser();
        browser.navigate("http://fake").await.unwrap();
        browser.fill(&ElementRef::new(LOGIN_INPUT, 0), &fixtures.auth.login).await.unwrap();
        browser.fill(&ElementRef::new(PASSWORD_INPUT, 0), &fixtures.auth.password).await.unwrap();
        browser.click(&ElementRef::new(LOGIN_BUTTON, 0)).await.unwrap();

        assert!(!browser.query(CODE_INPUT).await.unwrap()[0].visible);
        assert!(browser.query(CODE_INPUT).await.unwrap()[0].visible);
        assert_eq!(browser.screen(), Screen::Verification);
    }

    #[tokio::test]
    async fn test_hidden_elements_refuse_actions() {
        let browser = bank(0).browser();
        browser.navigate("http://fake").await.unwrap();
        let err = browser.click(&ElementRef::new(TRANSFER_BUTTON, 0)).await.unwrap_err();
        assert!(matches!(err, E2eError::Driver(_)));
    }

    #[tokio::test]
    async fn test_closed_session_fails() {
        let browser = bank(0).browser();
        browser.close().await.unwrap();
        assert!(browser.navigate("http://fake").await.is_err());
        assert!(browser.query(LOGIN_INPUT).await.is_err());
    }

    #[tokio::test]
    async fn test_sessions_share_backend() {
        let fixtures = Fixtures::default();
        let bank = bank(0).with_balances(&[15_000, 5_000]);
        let _a = bank.browser();
        let _b = bank.browser();
        assert_eq!(bank.sessions_opened(), 2);
        assert_eq!(bank.balance(fixtures.first_card()), Some(15_000));
        assert_eq!(bank.total(), 20_000);
    }
}
