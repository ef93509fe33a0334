//! Core types for the ibank harness

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::balance::Balance;
use crate::error::{Error, Result};

/// Login and password pair typed into the login form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Same password, different login
    pub fn with_login(&self, login: impl Into<String>) -> Self {
        Self::new(login, self.password.clone())
    }

    /// Same login, different password
    pub fn with_password(&self, password: impl Into<String>) -> Self {
        Self::new(self.login.clone(), password)
    }
}

/// The fixture user that owns the dashboard cards
pub type AuthInfo = Credentials;

/// Account state as understood by the registration endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Blocked,
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// A user as posted to the test registration endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub login: String,
    pub password: String,
    pub status: AccountStatus,
}

impl RegisteredUser {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.login.clone(), self.password.clone())
    }
}

/// One-time code completing the two-step login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationCode(pub String);

impl VerificationCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A payment card as shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInfo {
    /// Full card number, e.g. "5559 0000 0000 0001"
    pub number: String,

    /// Value of the tile's `data-test-id` attribute
    pub test_id: String,

    /// Human-readable name used in logs
    #[serde(default)]
    pub label: String,
}

impl CardInfo {
    pub fn new(number: impl Into<String>, test_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            test_id: test_id.into(),
            label: label.into(),
        }
    }

    /// The last four digits, which is all the dashboard renders unmasked.
    pub fn last_digits(&self) -> String {
        let digits: Vec<char> = self.number.chars().filter(|c| c.is_ascii_digit()).collect();
        let start = digits.len().saturating_sub(4);
        digits[start..].iter().collect()
    }

    /// Whether two fixtures refer to the same physical card
    pub fn same_card(&self, other: &CardInfo) -> bool {
        self.test_id == other.test_id || self.digits() == other.digits()
    }

    fn digits(&self) -> String {
        self.number.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

impl fmt::Display for CardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "*{}", self.last_digits())
        } else {
            write!(f, "{} (*{})", self.label, self.last_digits())
        }
    }
}

/// What the application is expected to do with a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Valid,
    ZeroAmount,
    ExceedsBalance,
    SameCard,
    Malformed,
}

impl TransferKind {
    pub fn should_succeed(self) -> bool {
        matches!(self, TransferKind::Valid)
    }
}

/// A transfer as typed into the transfer form.
///
/// The amount stays a string so malformed input can be submitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub amount: String,
    pub source: CardInfo,
    pub target: CardInfo,
}

impl TransferRequest {
    pub fn new(amount: impl ToString, source: CardInfo, target: CardInfo) -> Self {
        Self {
            amount: amount.to_string(),
            source,
            target,
        }
    }

    /// Numeric value of the amount field
    pub fn amount_value(&self) -> Result<i64> {
        self.amount
            .trim()
            .parse::<i64>()
            .map_err(|e| Error::InvalidAmount(format!("'{}': {}", self.amount, e)))
    }

    /// Expected outcome given the source card balance before the transfer
    pub fn classify(&self, source_balance: Balance) -> TransferKind {
        if self.source.same_card(&self.target) {
            return TransferKind::SameCard;
        }
        match self.amount_value() {
            Err(_) => TransferKind::Malformed,
            Ok(a) if a < 0 => TransferKind::Malformed,
            Ok(0) => TransferKind::ZeroAmount,
            Ok(a) if a > source_balance.amount() => TransferKind::ExceedsBalance,
            Ok(_) => TransferKind::Valid,
        }
    }
}

/// Notification banner as read from the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotification {
    pub message: String,
    pub visible: bool,
}

impl ErrorNotification {
    pub fn visible(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            visible: true,
        }
    }

    /// Case-insensitive substring match on the banner text
    pub fn contains(&self, needle: &str) -> bool {
        self.message.to_lowercase().contains(&needle.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first() -> CardInfo {
        CardInfo::new("5559 0000 0000 0001", "92df3f1c-a033-48e6-8390-206f6b1f56c0", "first")
    }

    fn second() -> CardInfo {
        CardInfo::new("5559 0000 0000 0002", "0f3f5c2a-249e-4c3d-8287-09f7a039391d", "second")
    }

    #[test]
    fn test_last_digits() {
        assert_eq!(first().last_digits(), "0001");
        assert_eq!(CardInfo::new("12", "x", "").last_digits(), "12");
    }

    #[test]
    fn test_classify_transfers() {
        let balance = Balance::new(10_000);
        assert_eq!(TransferRequest::new(3000, first(), second()).classify(balance), TransferKind::Valid);
        assert_eq!(TransferRequest::new(10_000, first(), second()).classify(balance), TransferKind::Valid);
        assert_eq!(TransferRequest::new(15_000, first(), second()).classify(balance), TransferKind::ExceedsBalance);
        assert_eq!(TransferRequest::new(0, first(), second()).classify(balance), TransferKind::ZeroAmount);
        assert_eq!(TransferRequest::new(10, first(), first()).classify(balance), TransferKind::SameCard);
        assert_eq!(TransferRequest::new("ten", first(), second()).classify(balance), TransferKind::Malformed);
        assert_eq!(TransferRequest::new(-5, first(), second()).classify(balance), TransferKind::Malformed);
    }

    #[test]
    fn test_status_wire_format() {
        let user = RegisteredUser {
            login: "ivan".into(),
            password: "secret".into(),
            status: AccountStatus::Blocked,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["status"], "blocked");
    }

    #[test]
    fn test_notification_contains_ignores_case() {
        let n = ErrorNotification::visible("Ошибка! Пользователь заблокирован");
        assert!(n.contains("ошибка"));
        assert!(!n.contains("неверно"));
    }
}
