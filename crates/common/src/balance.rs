//! Card balances as rendered on the dashboard

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::CardInfo;

/// Integer amount, currency implicit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(i64);

impl Balance {
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Extract the amount between `markers.prefix` and `markers.suffix`.
    ///
    /// The suffix is searched after the prefix, so a tile label that happens
    /// to contain the suffix earlier does not confuse the parser.
    pub fn parse(text: &str, markers: &BalanceMarkers) -> Result<Self> {
        let start = text
            .find(&markers.prefix)
            .ok_or_else(|| Error::parse(text, format!("prefix '{}' not found", markers.prefix)))?
            + markers.prefix.len();
        let len = text[start..]
            .find(&markers.suffix)
            .ok_or_else(|| Error::parse(text, format!("suffix '{}' not found", markers.suffix)))?;
        let value = text[start..start + len].trim();
        value
            .parse::<i64>()
            .map(Balance)
            .map_err(|e| Error::parse(text, format!("'{}' is not an integer: {}", value, e)))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Balance {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

/// Text markers bracketing the amount inside a card tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceMarkers {
    pub prefix: String,
    pub suffix: String,
}

impl BalanceMarkers {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// English rendering of the dashboard
    pub fn english() -> Self {
        Self::new("balance: ", " rub.")
    }
}

impl Default for BalanceMarkers {
    fn default() -> Self {
        Self::new("баланс: ", " р.")
    }
}

/// Balances of a set of cards read at one moment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    entries: Vec<(CardInfo, Balance)>,
}

impl BalanceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, card: CardInfo, balance: Balance) {
        match self.entries.iter_mut().find(|(c, _)| c.same_card(&card)) {
            Some(entry) => entry.1 = balance,
            None => self.entries.push((card, balance)),
        }
    }

    pub fn get(&self, card: &CardInfo) -> Option<Balance> {
        self.entries
            .iter()
            .find(|(c, _)| c.same_card(card))
            .map(|(_, b)| *b)
    }

    pub fn cards(&self) -> impl Iterator<Item = &CardInfo> {
        self.entries.iter().map(|(c, _)| c)
    }

    /// Sum over all cards; conserved by any successful transfer
    pub fn total(&self) -> i64 {
        self.entries.iter().map(|(_, b)| b.amount()).sum()
    }

    /// The snapshot a correct application shows after moving `amount`
    pub fn after_transfer(&self, source: &CardInfo, target: &CardInfo, amount: i64) -> Self {
        let mut next = self.clone();
        for (card, balance) in next.entries.iter_mut() {
            if card.same_card(source) {
                *balance = Balance(balance.0 - amount);
            } else if card.same_card(target) {
                *balance = Balance(balance.0 + amount);
            }
        }
        next
    }

    /// Human-readable differences between this (expected) snapshot and `actual`
    pub fn mismatches(&self, actual: &BalanceSnapshot) -> Vec<String> {
        let mut out = Vec::new();
        for (card, expected) in &self.entries {
            match actual.get(card) {
                Some(got) if got == *expected => {}
                Some(got) => out.push(format!("{}: expected {}, got {}", card, expected, got)),
                None => out.push(format!("{}: missing from snapshot", card)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn card(n: u8) -> CardInfo {
        CardInfo::new(format!("5559 0000 0000 000{}", n), format!("id-{}", n), "")
    }

    #[test_case("**** **** **** 0001, баланс: 10000 р.\nПополнить", 10000 ; "russian tile")]
    #[test_case("**** **** **** 0002, баланс: 0 р.", 0 ; "zero")]
    #[test_case("**** 0002, баланс: -150 р.", -150 ; "negative")]
    #[test_case("баланс:  42  р.", 42 ; "padded interior")]
    fn test_parse_balance(text: &str, expected: i64) {
        let balance = Balance::parse(text, &BalanceMarkers::default()).unwrap();
        assert_eq!(balance.amount(), expected);
    }

    #[test]
    fn test_parse_english_markers() {
        let text = "**** **** **** 0001, balance: 15000 rub.";
        let balance = Balance::parse(text, &BalanceMarkers::english()).unwrap();
        assert_eq!(balance, Balance::new(15_000));
    }

    #[test_case("**** 0001, 10000 р." ; "missing prefix")]
    #[test_case("**** 0001, баланс: 10000" ; "missing suffix")]
    #[test_case("**** 0001, баланс: много р." ; "non numeric")]
    #[test_case("**** 0001, баланс:  р." ; "empty interior")]
    fn test_parse_balance_rejects(text: &str) {
        let err = Balance::parse(text, &BalanceMarkers::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_suffix_searched_after_prefix() {
        let markers = BalanceMarkers::new("balance: ", " rub.");
        let text = "gift rub. card, balance: 7 rub.";
        assert_eq!(Balance::parse(text, &markers).unwrap().amount(), 7);
    }

    #[test]
    fn test_transfer_conserves_total() {
        let mut before = BalanceSnapshot::new();
        before.insert(card(1), Balance::new(15_000));
        before.insert(card(2), Balance::new(5_000));

        let after = before.after_transfer(&card(1), &card(2), 3_000);
        assert_eq!(after.get(&card(1)), Some(Balance::new(12_000)));
        assert_eq!(after.get(&card(2)), Some(Balance::new(8_000)));
        assert_eq!(before.total(), after.total());
        assert_eq!(before.mismatches(&after).len(), 2);
        assert!(after.mismatches(&after).is_empty());
    }
}
