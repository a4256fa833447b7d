//! Page automation driver.
//!
//! The automation core never talks to a browser directly; it depends on the
//! narrow [`PageDriver`] capability trait (navigate/find/click/type/read/
//! evaluate). Two implementations live here:
//!
//! - [`cdp::CdpDriver`]: real browser automation over chromiumoxide (CDP),
//!   compiled with the `browser` feature.
//! - [`fake::FakePage`]: a scripted in-memory page used by tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};

/// Opaque handle to a located element. Valid until the next navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element(pub(crate) u64);

/// Synchronous-feeling capability surface over a single browser page.
///
/// All operations are non-reentrant: one in-flight call per page at a time.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;
    async fn wait_load(&self) -> Result<()>;
    /// Document-wide query. `Ok(None)` when no element matches.
    async fn find(&self, selector: &str) -> Result<Option<Element>>;
    async fn find_all(&self, selector: &str) -> Result<Vec<Element>>;
    /// Query scoped to the children of `scope`.
    async fn find_in(&self, scope: Element, selector: &str) -> Result<Option<Element>>;
    async fn find_all_in(&self, scope: Element, selector: &str) -> Result<Vec<Element>>;
    async fn read_text(&self, el: Element) -> Result<String>;
    async fn read_attribute(&self, el: Element, name: &str) -> Result<Option<String>>;
    async fn click(&self, el: Element) -> Result<()>;
    async fn type_text(&self, el: Element, text: &str) -> Result<()>;
    async fn scroll_into_view(&self, el: Element) -> Result<()>;
    async fn evaluate(&self, script: &str) -> Result<Value>;
}

/// Find an element or fail with [`Error::ElementNotFound`] naming the selector.
pub async fn require(page: &dyn PageDriver, selector: &str) -> Result<Element> {
    page.find(selector)
        .await?
        .ok_or_else(|| Error::ElementNotFound(selector.to_string()))
}

/// Try an ordered list of candidate selectors; first match wins.
pub async fn find_first(page: &dyn PageDriver, selectors: &[&str]) -> Result<Option<Element>> {
    for selector in selectors {
        if let Some(el) = page.find(selector).await? {
            return Ok(Some(el));
        }
    }
    Ok(None)
}

#[cfg(feature = "browser")]
pub mod cdp {
    //! Real browser automation over chromiumoxide.

    use super::*;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures_util::StreamExt;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Browser launch options.
    #[derive(Debug, Clone)]
    pub struct BrowserOptions {
        pub headless: bool,
        pub nav_timeout: Duration,
    }

    impl Default for BrowserOptions {
        fn default() -> Self {
            Self {
                headless: true,
                nav_timeout: Duration::from_secs(10),
            }
        }
    }

    /// Owns the browser process, its CDP event loop, and one page.
    pub struct CdpDriver {
        browser: Browser,
        handler_task: tokio::task::JoinHandle<()>,
        page: CdpPage,
    }

    impl CdpDriver {
        /// Launch a browser and open a blank page.
        pub async fn launch(options: &BrowserOptions) -> Result<Self> {
            let mut builder = BrowserConfig::builder();
            if !options.headless {
                builder = builder.with_head();
            }
            let config = builder
                .build()
                .map_err(|e| Error::Driver(format!("browser config: {}", e)))?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| Error::Driver(format!("browser launch: {}", e)))?;

            // The handler stream must be drained for the browser to function.
            let handler_task = tokio::spawn(async move {
                while let Some(_event) = handler.next().await {}
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| Error::Driver(format!("open page: {}", e)))?;

            Ok(Self {
                browser,
                handler_task,
                page: CdpPage {
                    page,
                    nav_timeout: options.nav_timeout,
                    elements: Mutex::new(HashMap::new()),
                    next_id: AtomicU64::new(1),
                },
            })
        }

        pub fn page(&self) -> &CdpPage {
            &self.page
        }

        /// Close the browser and stop the event loop.
        pub async fn close(mut self) {
            let _ = self.browser.close().await;
            self.handler_task.abort();
        }
    }

    /// [`PageDriver`] over a single chromiumoxide page.
    ///
    /// Located elements are cached in a handle map and operated on in place
    /// under its lock; handles are invalidated by navigation, matching the
    /// trait contract. The page is non-reentrant anyway, so holding the lock
    /// across an element operation costs nothing.
    pub struct CdpPage {
        page: Page,
        nav_timeout: Duration,
        elements: Mutex<HashMap<u64, chromiumoxide::Element>>,
        next_id: AtomicU64,
    }

    impl CdpPage {
        fn next_handle(&self) -> u64 {
            self.next_id.fetch_add(1, Ordering::Relaxed)
        }

        async fn store(&self, el: chromiumoxide::Element) -> Element {
            let id = self.next_handle();
            self.elements.lock().await.insert(id, el);
            Element(id)
        }
    }

    fn stale(el: Element) -> Error {
        Error::Driver(format!("stale element handle {}", el.0))
    }

    #[async_trait]
    impl PageDriver for CdpPage {
        async fn navigate(&self, url: &str) -> Result<()> {
            self.elements.lock().await.clear();
            self.page
                .goto(url)
                .await
                .map_err(|e| Error::Navigation(format!("{}: {}", url, e)))?;
            Ok(())
        }

        async fn wait_load(&self) -> Result<()> {
            tokio::time::timeout(self.nav_timeout, self.page.wait_for_navigation())
                .await
                .map_err(|_| Error::Timeout("page load".to_string()))?
                .map_err(|e| Error::Navigation(format!("page load: {}", e)))?;
            Ok(())
        }

        async fn find(&self, selector: &str) -> Result<Option<Element>> {
            match self.page.find_element(selector).await {
                Ok(el) => Ok(Some(self.store(el).await)),
                Err(_) => Ok(None),
            }
        }

        async fn find_all(&self, selector: &str) -> Result<Vec<Element>> {
            let found = self.page.find_elements(selector).await.unwrap_or_default();
            let mut handles = Vec::with_capacity(found.len());
            for el in found {
                handles.push(self.store(el).await);
            }
            Ok(handles)
        }

        async fn find_in(&self, scope: Element, selector: &str) -> Result<Option<Element>> {
            let mut elements = self.elements.lock().await;
            let parent = elements.get(&scope.0).ok_or_else(|| stale(scope))?;
            match parent.find_element(selector).await {
                Ok(el) => {
                    let id = self.next_handle();
                    elements.insert(id, el);
                    Ok(Some(Element(id)))
                }
                Err(_) => Ok(None),
            }
        }

        async fn find_all_in(&self, scope: Element, selector: &str) -> Result<Vec<Element>> {
            let mut elements = self.elements.lock().await;
            let parent = elements.get(&scope.0).ok_or_else(|| stale(scope))?;
            let found = parent.find_elements(selector).await.unwrap_or_default();
            let mut handles = Vec::with_capacity(found.len());
            for el in found {
                let id = self.next_handle();
                elements.insert(id, el);
                handles.push(Element(id));
            }
            Ok(handles)
        }

        async fn read_text(&self, el: Element) -> Result<String> {
            let elements = self.elements.lock().await;
            let elem = elements.get(&el.0).ok_or_else(|| stale(el))?;
            let text = elem
                .inner_text()
                .await
                .map_err(|e| Error::Driver(format!("read text: {}", e)))?;
            Ok(text.unwrap_or_default())
        }

        async fn read_attribute(&self, el: Element, name: &str) -> Result<Option<String>> {
            let elements = self.elements.lock().await;
            let elem = elements.get(&el.0).ok_or_else(|| stale(el))?;
            elem.attribute(name)
                .await
                .map_err(|e| Error::Driver(format!("read attribute {}: {}", name, e)))
        }

        async fn click(&self, el: Element) -> Result<()> {
            let elements = self.elements.lock().await;
            let elem = elements.get(&el.0).ok_or_else(|| stale(el))?;
            elem.click()
                .await
                .map_err(|e| Error::Driver(format!("click: {}", e)))?;
            Ok(())
        }

        async fn type_text(&self, el: Element, text: &str) -> Result<()> {
            let elements = self.elements.lock().await;
            let elem = elements.get(&el.0).ok_or_else(|| stale(el))?;
            elem.click()
                .await
                .map_err(|e| Error::Driver(format!("focus: {}", e)))?;
            elem.type_str(text)
                .await
                .map_err(|e| Error::Driver(format!("type: {}", e)))?;
            Ok(())
        }

        async fn scroll_into_view(&self, el: Element) -> Result<()> {
            let elements = self.elements.lock().await;
            let elem = elements.get(&el.0).ok_or_else(|| stale(el))?;
            elem.scroll_into_view()
                .await
                .map_err(|e| Error::Driver(format!("scroll: {}", e)))?;
            Ok(())
        }

        async fn evaluate(&self, script: &str) -> Result<Value> {
            let result = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| Error::Driver(format!("evaluate: {}", e)))?;
            Ok(result.into_value().unwrap_or(Value::Null))
        }
    }
}

pub mod fake {
    //! Scripted in-memory page for tests.
    //!
    //! Documents are keyed by URL and hold flat node lists; a node answers to
    //! exactly one selector string. Document-level queries match any node,
    //! scoped queries match direct children only. Clicks and typed text are
    //! recorded for assertions, and a click can be scripted to navigate.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default, Clone)]
    struct Node {
        selector: String,
        parent: Option<usize>,
        text: String,
        attrs: HashMap<String, String>,
    }

    #[derive(Debug, Default)]
    struct State {
        url: String,
        docs: HashMap<String, Vec<Node>>,
        cookies: String,
        eval_stubs: Vec<(String, Value)>,
        clicks: Vec<(String, String)>,
        typed: Vec<(String, String, String)>,
        click_navigations: HashMap<(String, usize), String>,
    }

    #[derive(Default)]
    pub struct FakePage {
        state: Mutex<State>,
    }

    impl FakePage {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register an empty document at `url`.
        pub fn add_doc(&self, url: &str) {
            self.state
                .lock()
                .unwrap()
                .docs
                .entry(url.to_string())
                .or_default();
        }

        /// Add a top-level node to `url`'s document; returns its id.
        pub fn node(&self, url: &str, selector: &str, text: &str) -> usize {
            self.insert(url, None, selector, text)
        }

        /// Add a node as a direct child of `parent`.
        pub fn child(&self, url: &str, parent: usize, selector: &str, text: &str) -> usize {
            self.insert(url, Some(parent), selector, text)
        }

        fn insert(&self, url: &str, parent: Option<usize>, selector: &str, text: &str) -> usize {
            let mut state = self.state.lock().unwrap();
            let doc = state.docs.entry(url.to_string()).or_default();
            doc.push(Node {
                selector: selector.to_string(),
                parent,
                text: text.to_string(),
                attrs: HashMap::new(),
            });
            doc.len() - 1
        }

        pub fn attr(&self, url: &str, node: usize, name: &str, value: &str) {
            let mut state = self.state.lock().unwrap();
            if let Some(n) = state.docs.get_mut(url).and_then(|d| d.get_mut(node)) {
                n.attrs.insert(name.to_string(), value.to_string());
            }
        }

        pub fn set_text(&self, url: &str, node: usize, text: &str) {
            let mut state = self.state.lock().unwrap();
            if let Some(n) = state.docs.get_mut(url).and_then(|d| d.get_mut(node)) {
                n.text = text.to_string();
            }
        }

        /// Script a click on `node` to navigate the page to `target`.
        pub fn navigate_on_click(&self, url: &str, node: usize, target: &str) {
            self.state
                .lock()
                .unwrap()
                .click_navigations
                .insert((url.to_string(), node), target.to_string());
        }

        /// Stub an `evaluate` result for any script containing `fragment`.
        pub fn stub_eval(&self, fragment: &str, value: Value) {
            self.state
                .lock()
                .unwrap()
                .eval_stubs
                .push((fragment.to_string(), value));
        }

        pub fn current_url(&self) -> String {
            self.state.lock().unwrap().url.clone()
        }

        /// All clicks so far, as (url, selector) pairs.
        pub fn clicks(&self) -> Vec<(String, String)> {
            self.state.lock().unwrap().clicks.clone()
        }

        /// All typed text so far, as (url, selector, text) triples.
        pub fn typed(&self) -> Vec<(String, String, String)> {
            self.state.lock().unwrap().typed.clone()
        }

        pub fn cookies(&self) -> String {
            self.state.lock().unwrap().cookies.clone()
        }

        pub fn set_cookies(&self, cookies: &str) {
            self.state.lock().unwrap().cookies = cookies.to_string();
        }

        fn with_node<T>(&self, el: Element, f: impl FnOnce(&Node) -> T) -> Result<T> {
            let state = self.state.lock().unwrap();
            let doc = state
                .docs
                .get(&state.url)
                .ok_or_else(|| Error::Driver("no document loaded".into()))?;
            let node = doc
                .get(el.0 as usize)
                .ok_or_else(|| Error::Driver(format!("stale element handle {}", el.0)))?;
            Ok(f(node))
        }
    }

    #[async_trait]
    impl PageDriver for FakePage {
        async fn navigate(&self, url: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.docs.entry(url.to_string()).or_default();
            state.url = url.to_string();
            Ok(())
        }

        async fn wait_load(&self) -> Result<()> {
            Ok(())
        }

        async fn find(&self, selector: &str) -> Result<Option<Element>> {
            let state = self.state.lock().unwrap();
            let Some(doc) = state.docs.get(&state.url) else {
                return Ok(None);
            };
            Ok(doc
                .iter()
                .position(|n| n.selector == selector)
                .map(|i| Element(i as u64)))
        }

        async fn find_all(&self, selector: &str) -> Result<Vec<Element>> {
            let state = self.state.lock().unwrap();
            let Some(doc) = state.docs.get(&state.url) else {
                return Ok(Vec::new());
            };
            Ok(doc
                .iter()
                .enumerate()
                .filter(|(_, n)| n.selector == selector)
                .map(|(i, _)| Element(i as u64))
                .collect())
        }

        async fn find_in(&self, scope: Element, selector: &str) -> Result<Option<Element>> {
            let state = self.state.lock().unwrap();
            let Some(doc) = state.docs.get(&state.url) else {
                return Ok(None);
            };
            Ok(doc
                .iter()
                .position(|n| n.selector == selector && n.parent == Some(scope.0 as usize))
                .map(|i| Element(i as u64)))
        }

        async fn find_all_in(&self, scope: Element, selector: &str) -> Result<Vec<Element>> {
            let state = self.state.lock().unwrap();
            let Some(doc) = state.docs.get(&state.url) else {
                return Ok(Vec::new());
            };
            Ok(doc
                .iter()
                .enumerate()
                .filter(|(_, n)| n.selector == selector && n.parent == Some(scope.0 as usize))
                .map(|(i, _)| Element(i as u64))
                .collect())
        }

        async fn read_text(&self, el: Element) -> Result<String> {
            self.with_node(el, |n| n.text.clone())
        }

        async fn read_attribute(&self, el: Element, name: &str) -> Result<Option<String>> {
            self.with_node(el, |n| n.attrs.get(name).cloned())
        }

        async fn click(&self, el: Element) -> Result<()> {
            let target = {
                let mut state = self.state.lock().unwrap();
                let url = state.url.clone();
                let selector = state
                    .docs
                    .get(&url)
                    .and_then(|d| d.get(el.0 as usize))
                    .map(|n| n.selector.clone())
                    .ok_or_else(|| Error::Driver(format!("stale element handle {}", el.0)))?;
                state.clicks.push((url.clone(), selector));
                state.click_navigations.get(&(url, el.0 as usize)).cloned()
            };
            if let Some(target) = target {
                self.navigate(&target).await?;
            }
            Ok(())
        }

        async fn type_text(&self, el: Element, text: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            let url = state.url.clone();
            let node = state
                .docs
                .get_mut(&url)
                .and_then(|d| d.get_mut(el.0 as usize))
                .ok_or_else(|| Error::Driver(format!("stale element handle {}", el.0)))?;
            node.attrs.insert("value".to_string(), text.to_string());
            let selector = node.selector.clone();
            state.typed.push((url, selector, text.to_string()));
            Ok(())
        }

        async fn scroll_into_view(&self, _el: Element) -> Result<()> {
            Ok(())
        }

        async fn evaluate(&self, script: &str) -> Result<Value> {
            let mut state = self.state.lock().unwrap();
            if script.contains("location.href") {
                return Ok(Value::String(state.url.clone()));
            }
            if let Some(rest) = script.strip_prefix("document.cookie = \"") {
                if let Some(cookie) = rest.split("; path=/").next() {
                    if !state.cookies.is_empty() {
                        state.cookies.push_str("; ");
                    }
                    state.cookies.push_str(cookie);
                }
                return Ok(Value::Null);
            }
            if script.contains("document.cookie") {
                return Ok(Value::String(state.cookies.clone()));
            }
            for (fragment, value) in &state.eval_stubs {
                if script.contains(fragment.as_str()) {
                    return Ok(value.clone());
                }
            }
            Ok(Value::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakePage;
    use super::*;

    #[tokio::test]
    async fn test_find_and_read() {
        let page = FakePage::new();
        let n = page.node("mock://p", "#name", "Ada Lovelace");
        page.attr("mock://p", n, "data-id", "7");
        page.navigate("mock://p").await.unwrap();

        let el = require(&page, "#name").await.unwrap();
        assert_eq!(page.read_text(el).await.unwrap(), "Ada Lovelace");
        assert_eq!(
            page.read_attribute(el, "data-id").await.unwrap(),
            Some("7".to_string())
        );
        assert!(page.find("#missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_require_reports_selector() {
        let page = FakePage::new();
        page.navigate("mock://empty").await.unwrap();
        let err = require(&page, "#connect-btn").await.unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(s) if s == "#connect-btn"));
    }

    #[tokio::test]
    async fn test_find_first_priority_order() {
        let page = FakePage::new();
        page.node("mock://p", ".fallback", "second");
        page.node("mock://p", "#primary", "first");
        page.navigate("mock://p").await.unwrap();

        let el = find_first(&page, &["#primary", ".fallback"])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.read_text(el).await.unwrap(), "first");

        let el = find_first(&page, &["#nope", ".fallback"])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.read_text(el).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_scoped_queries() {
        let page = FakePage::new();
        let card = page.node("mock://s", ".profile-card", "");
        page.child("mock://s", card, "a", "Grace Hopper");
        let other = page.node("mock://s", ".profile-card", "");
        page.child("mock://s", other, "a", "Alan Turing");
        page.navigate("mock://s").await.unwrap();

        let cards = page.find_all(".profile-card").await.unwrap();
        assert_eq!(cards.len(), 2);
        let link = page.find_in(cards[1], "a").await.unwrap().unwrap();
        assert_eq!(page.read_text(link).await.unwrap(), "Alan Turing");
    }

    #[tokio::test]
    async fn test_click_navigation_effect() {
        let page = FakePage::new();
        let btn = page.node("mock://login", "#login-btn", "Log in");
        page.navigate_on_click("mock://login", btn, "mock://search");
        page.navigate("mock://login").await.unwrap();

        let el = require(&page, "#login-btn").await.unwrap();
        page.click(el).await.unwrap();
        assert_eq!(page.current_url(), "mock://search");
        assert_eq!(page.clicks().len(), 1);
    }
}
