//! Test data: fixture defaults and randomized users and amounts

use rand::distributions::{Alphanumeric, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::balance::Balance;
use crate::types::{AccountStatus, AuthInfo, CardInfo, Credentials, RegisteredUser, VerificationCode};

/// Upper bound for amounts generated above a balance
const MAX_OVERDRAFT: i64 = 100_000;

/// Fixture data preloaded into the application under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixtures {
    /// Owner of the cards, passes two-step login
    pub auth: AuthInfo,

    /// Code accepted by the verification step
    pub verification_code: VerificationCode,

    /// Cards in dashboard order
    pub cards: Vec<CardInfo>,
}

impl Default for Fixtures {
    fn default() -> Self {
        Self {
            auth: Credentials::new("vasya", "qwerty123"),
            verification_code: VerificationCode::new("12345"),
            cards: vec![
                CardInfo::new(
                    "5559 0000 0000 0001",
                    "92df3f1c-a033-48e6-8390-206f6b1f56c0",
                    "first card",
                ),
                CardInfo::new(
                    "5559 0000 0000 0002",
                    "0f3f5c2a-249e-4c3d-8287-09f7a039391d",
                    "second card",
                ),
            ],
        }
    }
}

impl Fixtures {
    /// # Panics
    ///
    /// With fewer than two cards; `HarnessConfig::validate` rejects that
    /// before a runner is built.
    pub fn first_card(&self) -> &CardInfo {
        &self.cards[0]
    }

    pub fn second_card(&self) -> &CardInfo {
        &self.cards[1]
    }
}

/// Random test data
pub struct DataGenerator {
    rng: StdRng,
}

impl Default for DataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DataGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for reproducible runs
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn login(&mut self) -> String {
        let len = self.rng.gen_range(6..=12);
        let letters = Uniform::new_inclusive(b'a', b'z');
        (0..len).map(|_| self.rng.sample(letters) as char).collect()
    }

    pub fn password(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect()
    }

    pub fn credentials(&mut self) -> Credentials {
        Credentials::new(self.login(), self.password())
    }

    /// A user to be registered with the given status
    pub fn user(&mut self, status: AccountStatus) -> RegisteredUser {
        let user = RegisteredUser {
            login: self.login(),
            password: self.password(),
            status,
        };
        debug!("Generated {} user '{}'", status, user.login);
        user
    }

    /// Amount in `1..=balance`, or 0 when nothing can be moved
    pub fn valid_amount(&mut self, balance: Balance) -> i64 {
        if balance.amount() <= 0 {
            return 0;
        }
        self.rng.gen_range(1..=balance.amount())
    }

    /// Amount strictly greater than the balance
    pub fn invalid_amount(&mut self, balance: Balance) -> i64 {
        let floor = balance.amount().max(0) + 1;
        self.rng.gen_range(floor..=floor + MAX_OVERDRAFT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amounts_respect_balance() {
        let mut gen = DataGenerator::with_seed(7);
        let balance = Balance::new(10_000);
        for _ in 0..200 {
            let valid = gen.valid_amount(balance);
            assert!((1..=10_000).contains(&valid));
            assert!(gen.invalid_amount(balance) > 10_000);
        }
        assert_eq!(gen.valid_amount(Balance::new(0)), 0);
        assert!(gen.invalid_amount(Balance::new(-20)) >= 1);
    }

    #[test]
    fn test_generated_users_differ() {
        let mut gen = DataGenerator::with_seed(42);
        let a = gen.user(AccountStatus::Active);
        let b = gen.user(AccountStatus::Blocked);
        assert_ne!(a.login, b.login);
        assert_eq!(b.status, AccountStatus::Blocked);
        assert!(a.login.chars().all(|c| c.is_ascii_lowercase()));
        assert_eq!(a.password.len(), 12);
    }

    #[test]
    fn test_default_fixtures() {
        let fixtures = Fixtures::default();
        assert_eq!(fixtures.first_card().last_digits(), "0001");
        assert_eq!(fixtures.second_card().last_digits(), "0002");
        assert!(!fixtures.first_card().same_card(fixtures.second_card()));
    }
}
