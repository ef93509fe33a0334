//! Browser driver seam
//!
//! Everything the page objects know about the page goes through [`Driver`]:
//! CSS selectors in, rendered text, visibility and attributes out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::E2eResult;

/// One element matched by a selector, read at query time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Position among the selector's matches
    pub index: usize,

    /// Rendered text (`innerText`)
    #[serde(default)]
    pub text: String,

    /// Whether the element is rendered and visible
    #[serde(default)]
    pub visible: bool,

    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl ElementSnapshot {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Address of an element for actions: the nth match of `selector`,
/// optionally narrowed to the first `descendant` inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    pub selector: String,
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descendant: Option<String>,
}

impl ElementRef {
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
            descendant: None,
        }
    }

    pub fn descendant(mut self, selector: impl Into<String>) -> Self {
        self.descendant = Some(selector.into());
        self
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.selector, self.index)?;
        if let Some(d) = &self.descendant {
            write!(f, " {}", d)?;
        }
        Ok(())
    }
}

/// A live browser session
#[async_trait]
pub trait Driver: Send + Sync {
    /// Load `url` in the session's page
    async fn navigate(&self, url: &str) -> E2eResult<()>;

    /// All elements currently matching `selector`, in document order
    async fn query(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>>;

    /// Replace the value of an input
    async fn fill(&self, target: &ElementRef, value: &str) -> E2eResult<()>;

    async fn click(&self, target: &ElementRef) -> E2eResult<()>;

    /// Save a full-page screenshot
    async fn screenshot(&self, path: &Path) -> E2eResult<()>;

    /// Release the browser; further calls fail
    async fn close(&self) -> E2eResult<()>;
}
