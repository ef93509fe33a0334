//! Element locator: auto-waiting, strict lookup of rendered elements
//!
//! A lookup succeeds when exactly one visible element satisfies the selector
//! (and predicate, if any). Anything else is polled until the [`Wait`]
//! policy gives up:
//!
//! - nothing ever matched: `ElementNotFound`
//! - matches existed but none or several were visible: `Timeout`

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::driver::{Driver, ElementRef, ElementSnapshot};
use crate::error::E2eResult;
use crate::wait::{Probe, Wait};

/// Narrows a one-of-many selector to a single element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Rendered text contains the substring
    TextContains(String),
    /// Attribute is present with exactly this value
    AttributeEquals { name: String, value: String },
}

impl Predicate {
    pub fn text(needle: impl Into<String>) -> Self {
        Self::TextContains(needle.into())
    }

    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AttributeEquals {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, el: &ElementSnapshot) -> bool {
        match self {
            Predicate::TextContains(needle) => el.text.contains(needle.as_str()),
            Predicate::AttributeEquals { name, value } => el.attribute(name) == Some(value.as_str()),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::TextContains(needle) => write!(f, "text contains '{}'", needle),
            Predicate::AttributeEquals { name, value } => write!(f, "[{}='{}']", name, value),
        }
    }
}

/// A located element: its snapshot at lookup time plus an action handle
#[derive(Clone)]
pub struct Element {
    driver: Arc<dyn Driver>,
    target: ElementRef,
    snapshot: ElementSnapshot,
}

impl Element {
    /// Text as rendered when the element was located
    pub fn text(&self) -> &str {
        &self.snapshot.text
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.snapshot.attribute(name)
    }

    pub fn target(&self) -> &ElementRef {
        &self.target
    }

    pub async fn fill(&self, value: &str) -> E2eResult<()> {
        debug!("fill {} <- '{}'", self.target, value);
        self.driver.fill(&self.target, value).await
    }

    pub async fn click(&self) -> E2eResult<()> {
        debug!("click {}", self.target);
        self.driver.click(&self.target).await
    }

    /// Click the first `selector` match inside this element
    pub async fn click_child(&self, selector: &str) -> E2eResult<()> {
        let target = self.target.clone().descendant(selector);
        debug!("click {}", target);
        self.driver.click(&target).await
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("target", &self.target)
            .field("text", &self.snapshot.text)
            .finish()
    }
}

/// Resolves selectors against the live page
#[derive(Clone)]
pub struct ElementLocator {
    driver: Arc<dyn Driver>,
    wait: Wait,
}

impl ElementLocator {
    pub fn new(driver: Arc<dyn Driver>, wait: Wait) -> Self {
        Self { driver, wait }
    }

    /// Same driver, different polling policy
    pub fn with_wait(&self, wait: Wait) -> Self {
        Self {
            driver: self.driver.clone(),
            wait,
        }
    }

    pub fn policy(&self) -> Wait {
        self.wait
    }

    /// The single visible element matching `selector`
    pub async fn find(&self, selector: &str) -> E2eResult<Element> {
        self.find_matching(selector, None).await
    }

    /// The single visible element matching `selector` and `predicate`
    pub async fn find_by(&self, selector: &str, predicate: &Predicate) -> E2eResult<Element> {
        self.find_matching(selector, Some(predicate)).await
    }

    async fn find_matching(&self, selector: &str, predicate: Option<&Predicate>) -> E2eResult<Element> {
        let what = match predicate {
            Some(p) => format!("{} where {}", selector, p),
            None => selector.to_string(),
        };
        let driver = &self.driver;
        let snapshot = self
            .wait
            .until(&what, move || async move {
                let found = driver.query(selector).await?;
                Ok(single_visible(found, predicate))
            })
            .await?;
        Ok(self.element(selector, snapshot))
    }

    /// The single visible element whose text contains `needle`
    pub async fn wait_text(&self, selector: &str, needle: &str) -> E2eResult<Element> {
        let what = format!("{} with text '{}'", selector, needle);
        let driver = &self.driver;
        let snapshot = self
            .wait
            .until(&what, move || async move {
                let found = driver.query(selector).await?;
                Ok(match single_visible(found, None) {
                    Probe::Ready(el) if el.text.contains(needle) => Probe::Ready(el),
                    Probe::Ready(el) => Probe::Pending(format!("text is '{}'", el.text)),
                    other => other,
                })
            })
            .await?;
        Ok(self.element(selector, snapshot))
    }

    /// Race several selectors; returns the index of the first one that
    /// resolves to a single visible element, checked in order on each poll.
    pub async fn first_of(&self, selectors: &[&str]) -> E2eResult<(usize, Element)> {
        let what = selectors.join(" | ");
        let driver = &self.driver;
        let (index, snapshot) = self
            .wait
            .until(&what, move || async move {
                let mut pending = Vec::new();
                for (i, selector) in selectors.iter().enumerate() {
                    let found = driver.query(selector).await?;
                    match single_visible(found, None) {
                        Probe::Ready(el) => return Ok(Probe::Ready((i, el))),
                        Probe::Pending(detail) => pending.push(format!("{}: {}", selector, detail)),
                        Probe::Missing => {}
                    }
                }
                Ok(if pending.is_empty() {
                    Probe::Missing
                } else {
                    Probe::Pending(pending.join("; "))
                })
            })
            .await?;
        Ok((index, self.element(selectors[index], snapshot)))
    }

    /// Visible matches right now, without waiting
    pub async fn visible(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>> {
        let found = self.driver.query(selector).await?;
        Ok(found.into_iter().filter(|e| e.visible).collect())
    }

    /// Whether anything matching `selector` is visible right now
    pub async fn is_visible(&self, selector: &str) -> E2eResult<bool> {
        Ok(!self.visible(selector).await?.is_empty())
    }

    /// Poll until nothing matching `selector` is visible
    pub async fn wait_gone(&self, selector: &str) -> E2eResult<()> {
        let what = format!("{} to disappear", selector);
        let this = self;
        self.wait
            .until(&what, move || async move {
                let visible = this.visible(selector).await?;
                Ok(if visible.is_empty() {
                    Probe::Ready(())
                } else {
                    Probe::Pending(format!("{} still visible", visible.len()))
                })
            })
            .await
    }

    fn element(&self, selector: &str, snapshot: ElementSnapshot) -> Element {
        Element {
            driver: self.driver.clone(),
            target: ElementRef::new(selector, snapshot.index),
            snapshot,
        }
    }
}

/// Reduce a query result to the one visible element, if there is exactly one
fn single_visible(found: Vec<ElementSnapshot>, predicate: Option<&Predicate>) -> Probe<ElementSnapshot> {
    let candidates: Vec<ElementSnapshot> = match predicate {
        Some(p) => found.into_iter().filter(|e| p.matches(e)).collect(),
        None => found,
    };
    if candidates.is_empty() {
        return Probe::Missing;
    }

    let total = candidates.len();
    let mut visible: Vec<ElementSnapshot> = candidates.into_iter().filter(|e| e.visible).collect();
    match visible.len() {
        1 => Probe::Ready(visible.remove(0)),
        0 => Probe::Pending(format!("{} matched, none visible", total)),
        n => Probe::Pending(format!("{} visible matches, expected exactly one", n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn el(index: usize, text: &str, visible: bool) -> ElementSnapshot {
        ElementSnapshot {
            index,
            text: text.to_string(),
            visible,
            attributes: HashMap::new(),
        }
    }

    #[test]
    fn test_single_visible_picks_the_visible_one() {
        let found = vec![el(0, "a", false), el(1, "b", true)];
        match single_visible(found, None) {
            Probe::Ready(e) => assert_eq!(e.index, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_single_visible_rejects_ambiguity() {
        let found = vec![el(0, "a", true), el(1, "b", true)];
        assert!(matches!(single_visible(found, None), Probe::Pending(_)));
    }

    #[test]
    fn test_single_visible_hidden_is_pending() {
        assert!(matches!(single_visible(vec![el(0, "a", false)], None), Probe::Pending(_)));
        assert!(matches!(single_visible(vec![], None), Probe::Missing));
    }

    #[test]
    fn test_predicates() {
        let mut tile = el(0, "**** **** **** 0001, баланс: 100 р.", true);
        tile.attributes.insert("data-test-id".into(), "abc".into());

        assert!(Predicate::text("0001").matches(&tile));
        assert!(!Predicate::text("0002").matches(&tile));
        assert!(Predicate::attribute("data-test-id", "abc").matches(&tile));
        assert!(!Predicate::attribute("data-test-id", "ab").matches(&tile));
        assert!(!Predicate::attribute("id", "abc").matches(&tile));

        let other = el(1, "**** **** **** 0002", true);
        let picked = single_visible(vec![tile, other], Some(&Predicate::text("0002")));
        assert!(matches!(picked, Probe::Ready(ref e) if e.index == 1));
    }
}
