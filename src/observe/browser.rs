//! The injected browser capability.
//!
//! The observer owns exactly one driver and drives it synchronously; every
//! suspension is wrapped by the budget layer above. Production embeds a real
//! headless browser behind this trait; the crate ships [`ScriptedBrowser`],
//! a deterministic in-memory implementation used by the test suites.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::BrowserError;

/// URL and route of the current page plus its loading state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    pub url: String,
    pub route: String,
    pub loading: bool,
}

/// Structural snapshot of the DOM used for diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSnapshot {
    pub signature: String,
    pub node_count: u32,
    pub text_length: u32,
}

/// One captured network request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub method: String,
    pub url: String,
    pub status: Option<u16>,
}

/// One captured console message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleRecord {
    pub level: String,
    pub message: String,
}

/// Result of the bounded settle window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleReport {
    /// The page reached a quiescent state within the window.
    pub settled: bool,
    /// Activity (feedback, aria updates) arrived only late in the window.
    pub late_activity: bool,
}

/// Synchronous browser capability. One browser, one page, one expectation at
/// a time; no other component may hold a reference.
pub trait BrowserDriver {
    fn launch(&mut self) -> Result<(), BrowserError>;
    fn close(&mut self) -> Result<(), BrowserError>;

    fn navigate(&mut self, url: &str) -> Result<PageState, BrowserError>;
    fn page_state(&mut self) -> Result<PageState, BrowserError>;
    fn dom_snapshot(&mut self) -> Result<DomSnapshot, BrowserError>;
    fn screenshot(&mut self) -> Result<Vec<u8>, BrowserError>;

    fn selector_exists(&mut self, selector: &str) -> Result<bool, BrowserError>;
    fn click(&mut self, selector: &str) -> Result<(), BrowserError>;
    /// Submit the form owning the control at `selector`.
    fn submit(&mut self, selector: &str) -> Result<(), BrowserError>;
    fn settle(&mut self, window_ms: u64) -> Result<SettleReport, BrowserError>;

    /// Same-document link extraction in stable DOM order.
    fn extract_links(&mut self) -> Result<Vec<String>, BrowserError>;
    fn drain_network(&mut self) -> Result<Vec<NetworkRecord>, BrowserError>;
    fn drain_console(&mut self) -> Result<Vec<ConsoleRecord>, BrowserError>;
    fn aria_live_updates(&mut self) -> Result<Vec<String>, BrowserError>;
    /// A visible feedback element (toast, inline message) is present.
    fn feedback_visible(&mut self) -> Result<bool, BrowserError>;
}

// ============================================================================
// Scripted in-memory driver
// ============================================================================

/// Scripted effect of interacting with a selector.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Navigate the page to a URL.
    Navigate(String),
    /// Mutate the DOM by the given node/text deltas.
    MutateDom { node_delta: i32, text_delta: i32 },
    /// Show a feedback element.
    ShowFeedback,
    /// Publish an ARIA-live update.
    AriaUpdate(String),
    /// Issue a network request.
    Network(NetworkRecord),
    /// Log a console error.
    ConsoleError(String),
    /// Leave the page loading (stalled spinner).
    StartLoading,
    /// Do nothing at all.
    Nothing,
}

/// A scripted page in the fake site.
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    pub route: String,
    pub dom: DomSnapshot,
    pub links: Vec<String>,
    pub selectors: BTreeSet<String>,
}

impl ScriptedPage {
    #[must_use]
    pub fn new(route: &str) -> Self {
        Self {
            route: route.to_string(),
            dom: DomSnapshot {
                signature: format!("sig:{route}"),
                node_count: 40,
                text_length: 400,
            },
            links: Vec::new(),
            selectors: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_links(mut self, links: &[&str]) -> Self {
        self.links = links.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_selectors(mut self, selectors: &[&str]) -> Self {
        self.selectors = selectors.iter().map(|s| (*s).to_string()).collect();
        self
    }
}

/// Deterministic in-memory browser: a site map plus per-selector effects.
#[derive(Debug, Default)]
pub struct ScriptedBrowser {
    pages: BTreeMap<String, ScriptedPage>,
    effects: BTreeMap<String, Vec<Effect>>,
    current: Option<String>,
    launched: bool,
    fail_launch: Option<String>,
    /// Crash after this many navigations (simulates a dying browser).
    crash_after_navigations: Option<usize>,
    navigations: usize,
    loading: bool,
    feedback: bool,
    aria: Vec<String>,
    network: VecDeque<NetworkRecord>,
    console: VecDeque<ConsoleRecord>,
    dom_mutation: (i32, i32),
    late_activity: bool,
}

impl ScriptedBrowser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, url: &str, page: ScriptedPage) -> &mut Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn on_interact(&mut self, selector: &str, effects: Vec<Effect>) -> &mut Self {
        self.effects.insert(selector.to_string(), effects);
        self
    }

    pub fn fail_launch_with(&mut self, reason: &str) -> &mut Self {
        self.fail_launch = Some(reason.to_string());
        self
    }

    pub fn crash_after_navigations(&mut self, count: usize) -> &mut Self {
        self.crash_after_navigations = Some(count);
        self
    }

    /// Mark the next settle window as carrying late activity.
    pub fn script_late_activity(&mut self) -> &mut Self {
        self.late_activity = true;
        self
    }

    fn current_page(&self) -> Result<&ScriptedPage, BrowserError> {
        let url = self.current.as_ref().ok_or(BrowserError::PageCrashed {
            reason: "no page loaded".to_string(),
        })?;
        self.pages.get(url).ok_or(BrowserError::PageCrashed {
            reason: format!("page disappeared: {url}"),
        })
    }

    fn apply_effects(&mut self, selector: &str) -> Result<(), BrowserError> {
        let effects = self.effects.get(selector).cloned().unwrap_or_default();
        for effect in effects {
            match effect {
                Effect::Navigate(url) => {
                    self.navigate_internal(&url)?;
                }
                Effect::MutateDom {
                    node_delta,
                    text_delta,
                } => {
                    self.dom_mutation.0 += node_delta;
                    self.dom_mutation.1 += text_delta;
                }
                Effect::ShowFeedback => self.feedback = true,
                Effect::AriaUpdate(message) => self.aria.push(message),
                Effect::Network(record) => self.network.push_back(record),
                Effect::ConsoleError(message) => self.console.push_back(ConsoleRecord {
                    level: "error".to_string(),
                    message,
                }),
                Effect::StartLoading => self.loading = true,
                Effect::Nothing => {}
            }
        }
        Ok(())
    }

    fn navigate_internal(&mut self, url: &str) -> Result<PageState, BrowserError> {
        self.navigations += 1;
        if let Some(limit) = self.crash_after_navigations
            && self.navigations > limit
        {
            return Err(BrowserError::PageCrashed {
                reason: "browser process exited".to_string(),
            });
        }
        if !self.pages.contains_key(url) {
            return Err(BrowserError::NavigationFailed {
                url: url.to_string(),
                reason: "no such page".to_string(),
            });
        }
        self.current = Some(url.to_string());
        self.loading = false;
        self.dom_mutation = (0, 0);
        self.feedback = false;
        self.aria.clear();
        self.page_state()
    }
}

impl BrowserDriver for ScriptedBrowser {
    fn launch(&mut self) -> Result<(), BrowserError> {
        if let Some(reason) = &self.fail_launch {
            return Err(BrowserError::Unavailable {
                reason: reason.clone(),
            });
        }
        self.launched = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BrowserError> {
        self.launched = false;
        Ok(())
    }

    fn navigate(&mut self, url: &str) -> Result<PageState, BrowserError> {
        if !self.launched {
            return Err(BrowserError::Unavailable {
                reason: "browser not launched".to_string(),
            });
        }
        self.navigate_internal(url)
    }

    fn page_state(&mut self) -> Result<PageState, BrowserError> {
        let loading = self.loading;
        let page = self.current_page()?;
        Ok(PageState {
            url: self.current.clone().expect("current checked"),
            route: page.route.clone(),
            loading,
        })
    }

    fn dom_snapshot(&mut self) -> Result<DomSnapshot, BrowserError> {
        let (node_delta, text_delta) = self.dom_mutation;
        let page = self.current_page()?;
        let mut dom = page.dom.clone();
        dom.node_count = (dom.node_count as i64 + node_delta as i64).max(0) as u32;
        dom.text_length = (dom.text_length as i64 + text_delta as i64).max(0) as u32;
        if node_delta != 0 || text_delta != 0 {
            dom.signature = format!("{}+{node_delta}/{text_delta}", dom.signature);
        }
        Ok(dom)
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, BrowserError> {
        let dom = self.dom_snapshot()?;
        // Deterministic bytes derived from page identity only.
        Ok(format!("PNG:{}:{}", self.current.as_deref().unwrap_or(""), dom.signature).into_bytes())
    }

    fn selector_exists(&mut self, selector: &str) -> Result<bool, BrowserError> {
        Ok(self.current_page()?.selectors.contains(selector))
    }

    fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        if !self.selector_exists(selector)? {
            return Err(BrowserError::SelectorMissing {
                selector: selector.to_string(),
            });
        }
        self.apply_effects(selector)
    }

    fn submit(&mut self, selector: &str) -> Result<(), BrowserError> {
        if !self.selector_exists(selector)? {
            return Err(BrowserError::SelectorMissing {
                selector: selector.to_string(),
            });
        }
        self.apply_effects(selector)
    }

    fn settle(&mut self, _window_ms: u64) -> Result<SettleReport, BrowserError> {
        let report = SettleReport {
            settled: !self.loading,
            late_activity: self.late_activity,
        };
        self.late_activity = false;
        Ok(report)
    }

    fn extract_links(&mut self) -> Result<Vec<String>, BrowserError> {
        Ok(self.current_page()?.links.clone())
    }

    fn drain_network(&mut self) -> Result<Vec<NetworkRecord>, BrowserError> {
        Ok(self.network.drain(..).collect())
    }

    fn drain_console(&mut self) -> Result<Vec<ConsoleRecord>, BrowserError> {
        Ok(self.console.drain(..).collect())
    }

    fn aria_live_updates(&mut self) -> Result<Vec<String>, BrowserError> {
        Ok(std::mem::take(&mut self.aria))
    }

    fn feedback_visible(&mut self) -> Result<bool, BrowserError> {
        Ok(self.feedback)
    }
}

// ============================================================================
// Site-spec loading (scripted driver for CLI harnesses)
// ============================================================================

/// Serde form of one scripted effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SiteEffect {
    Navigate(String),
    #[serde(rename_all = "camelCase")]
    MutateDom { node_delta: i32, text_delta: i32 },
    ShowFeedback,
    AriaUpdate(String),
    Network(NetworkRecord),
    ConsoleError(String),
    StartLoading,
    Nothing,
}

impl From<SiteEffect> for Effect {
    fn from(effect: SiteEffect) -> Self {
        match effect {
            SiteEffect::Navigate(url) => Effect::Navigate(url),
            SiteEffect::MutateDom {
                node_delta,
                text_delta,
            } => Effect::MutateDom {
                node_delta,
                text_delta,
            },
            SiteEffect::ShowFeedback => Effect::ShowFeedback,
            SiteEffect::AriaUpdate(message) => Effect::AriaUpdate(message),
            SiteEffect::Network(record) => Effect::Network(record),
            SiteEffect::ConsoleError(message) => Effect::ConsoleError(message),
            SiteEffect::StartLoading => Effect::StartLoading,
            SiteEffect::Nothing => Effect::Nothing,
        }
    }
}

/// Serde form of one scripted page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitePage {
    pub route: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub selectors: Vec<String>,
}

/// A whole scripted site, loadable from JSON for binary-level harnesses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSpec {
    pub pages: BTreeMap<String, SitePage>,
    #[serde(default)]
    pub effects: BTreeMap<String, Vec<SiteEffect>>,
}

impl ScriptedBrowser {
    /// Build a scripted browser from a site spec.
    #[must_use]
    pub fn from_spec(spec: SiteSpec) -> Self {
        let mut browser = Self::new();
        for (url, page) in spec.pages {
            let mut scripted = ScriptedPage::new(&page.route);
            scripted.links = page.links;
            scripted.selectors = page.selectors.into_iter().collect();
            browser.add_page(&url, scripted);
        }
        for (selector, effects) in spec.effects {
            browser.on_interact(&selector, effects.into_iter().map(Effect::from).collect());
        }
        browser
    }
}
