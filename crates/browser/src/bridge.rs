//! The browser-automation capability consumed by the engine.
//!
//! Page interactions are expressed as a closed set of typed commands
//! (`Locator` x `PageAction`) instead of string-keyed dispatch, so an
//! unknown lookup/action combination is a compile error rather than a
//! silent no-op.

use std::time::Duration;

use async_trait::async_trait;
use slotwatch_core::Result;

/// How to locate an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Name(String),
    Class(String),
    XPath(String),
}

impl Locator {
    pub fn id(value: &str) -> Self {
        Locator::Id(value.to_string())
    }

    pub fn name(value: &str) -> Self {
        Locator::Name(value.to_string())
    }

    pub fn class(value: &str) -> Self {
        Locator::Class(value.to_string())
    }

    pub fn xpath(value: &str) -> Self {
        Locator::XPath(value.to_string())
    }

    /// An anchor containing the given text. Used as the post-login
    /// liveness landmark.
    pub fn link_with_text(text: &str) -> Self {
        Locator::XPath(format!("//a[contains(text(), '{}')]", text))
    }

    /// JS expression evaluating to the first matching element, or null.
    pub fn js_lookup(&self) -> String {
        match self {
            Locator::Id(id) => format!("document.getElementById({})", js_str(id)),
            Locator::Name(name) => {
                format!("(document.getElementsByName({})[0] || null)", js_str(name))
            }
            Locator::Class(class) => format!(
                "(document.getElementsByClassName({})[0] || null)",
                js_str(class)
            ),
            Locator::XPath(xpath) => format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                js_str(xpath)
            ),
        }
    }
}

/// What to do with a located element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    SendText(String),
    Click,
}

fn js_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Driving surface over a live browser page.
///
/// `execute_script` takes a function body; a `return` statement inside it
/// yields the call's string result.
#[async_trait]
pub trait Bridge: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Locate an element and apply an action to it. Errors when the
    /// element is missing.
    async fn apply(&self, locator: &Locator, action: &PageAction) -> Result<()>;

    /// Non-blocking presence probe. Any underlying error reads as absent.
    async fn exists(&self, locator: &Locator) -> bool;

    /// Poll for an element until it appears or the timeout expires.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()>;

    /// Read the `value` property of a (typically hidden) form element.
    async fn read_value(&self, locator: &Locator) -> Result<String>;

    async fn execute_script(&self, body: &str) -> Result<String>;

    async fn get_cookie(&self, name: &str) -> Result<Option<String>>;

    /// Release the underlying browser resource. Best effort.
    async fn close(&self);
}
