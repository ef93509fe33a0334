//! Bounded polling: the only way the harness waits for the page

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Outcome of one poll
#[derive(Debug)]
pub enum Probe<T> {
    /// Condition holds
    Ready(T),
    /// Nothing matched the selector yet
    Missing,
    /// Something matched but the condition does not hold yet
    Pending(String),
}

/// Poll-with-timeout policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for Wait {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(4),
            interval: Duration::from_millis(100),
        }
    }
}

impl Wait {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// A single probe with no waiting
    pub fn once() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Probe until `Ready` or the timeout elapses.
    ///
    /// The probe runs at least once. If no poll ever saw a match the error is
    /// `ElementNotFound { selector: what }`, otherwise `Timeout` with the last
    /// pending detail. Probe errors abort immediately.
    pub async fn until<T, F, Fut>(&self, what: &str, mut probe: F) -> E2eResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<Probe<T>>>,
    {
        let start = Instant::now();
        let mut attempts = 0usize;
        let mut last_pending: Option<String> = None;

        loop {
            attempts += 1;
            match probe().await? {
                Probe::Ready(value) => {
                    if attempts > 1 {
                        debug!("{} ready after {} polls ({:?})", what, attempts, start.elapsed());
                    }
                    return Ok(value);
                }
                Probe::Missing => {}
                Probe::Pending(detail) => last_pending = Some(detail),
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                break;
            }
            sleep(self.interval.min(self.timeout - elapsed)).await;
        }

        match last_pending {
            Some(detail) => Err(E2eError::Timeout {
                what: what.to_string(),
                waited_ms: start.elapsed().as_millis() as u64,
                detail,
            }),
            None => Err(E2eError::ElementNotFound {
                selector: what.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick() -> Wait {
        Wait::new(Duration::from_millis(60), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_ready_after_some_polls() {
        let polls = &AtomicUsize::new(0);
        let value = quick()
            .until("counter", move || async move {
                let n = polls.fetch_add(1, Ordering::SeqCst);
                Ok(if n >= 3 { Probe::Ready(n) } else { Probe::Missing })
            })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_never_matched_is_not_found() {
        let err = quick()
            .until::<(), _, _>("#nothing", || async { Ok(Probe::Missing) })
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::ElementNotFound { ref selector } if selector == "#nothing"));
    }

    #[tokio::test]
    async fn test_pending_is_timeout() {
        let err = quick()
            .until::<(), _, _>("#banner", || async { Ok(Probe::Pending("hidden".into())) })
            .await
            .unwrap_err();
        match err {
            E2eError::Timeout { what, detail, waited_ms } => {
                assert_eq!(what, "#banner");
                assert_eq!(detail, "hidden");
                assert!(waited_ms >= 60);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_once_probes_exactly_once() {
        let polls = &AtomicUsize::new(0);
        let _ = Wait::once()
            .until::<(), _, _>("x", move || async move {
                polls.fetch_add(1, Ordering::SeqCst);
                Ok(Probe::Missing)
            })
            .await;
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }
}
