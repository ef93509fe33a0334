//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Timeout after {waited_ms} ms waiting for {what}: {detail}")]
    Timeout {
        what: String,
        waited_ms: u64,
        detail: String,
    },

    #[error("Balance parse error: {0}")]
    Parse(#[from] ibank_common::Error),

    #[error("Verification rejected: {0}")]
    VerificationRejected(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    /// The application answered a submitted request wrongly; the harness
    /// itself got as far as it had to
    #[error("Application defect: {0}")]
    ApplicationDefect(String),

    #[error("Playwright not found. Install with: npm i playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Application failed to start: {0}")]
    AppStartup(String),

    #[error("Application health check failed after {0} attempts")]
    AppHealthCheck(usize),

    #[error("User registration failed: {0}")]
    Registration(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn assertion(msg: impl Into<String>) -> Self {
        E2eError::AssertionFailed(msg.into())
    }

    /// Reclassify a failed assertion as an application defect
    pub fn into_defect(self) -> Self {
        match self {
            E2eError::AssertionFailed(msg) => E2eError::ApplicationDefect(msg),
            other => other,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Fail the current scenario with `AssertionFailed` unless `cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::E2eError::AssertionFailed(format!($($arg)+)));
        }
    };
}

/// Fail with `AssertionFailed` unless both sides compare equal.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr, $($arg:tt)+) => {{
        let (l, r) = (&$left, &$right);
        if l != r {
            return Err($crate::error::E2eError::AssertionFailed(format!(
                "{}: expected {:?}, got {:?}",
                format!($($arg)+),
                r,
                l
            )));
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_assertions_become_defects() {
        let defect = E2eError::assertion("balances moved").into_defect();
        assert!(matches!(defect, E2eError::ApplicationDefect(ref m) if m == "balances moved"));
        assert_eq!(defect.to_string(), "Application defect: balances moved");

        let rejected = E2eError::VerificationRejected("wrong code".into()).into_defect();
        assert!(matches!(rejected, E2eError::VerificationRejected(_)));
        let missing = E2eError::ElementNotFound {
            selector: "[data-test-id='dashboard']".into(),
        }
        .into_defect();
        assert!(matches!(missing, E2eError::ElementNotFound { .. }));
    }
}
