//! Best-effort element location under uncertain target identity.
//!
//! Steps written for the old selector-based renderer carry a `target` CSS
//! selector that may no longer match anything. Location is therefore an
//! ordered chain of strategies tried in sequence, first match wins, and the
//! chain is expressed against the [`DomQuery`] trait so it can be exercised
//! without a live browser.

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Geometry of a located element, in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The slice of page behaviour the driver needs. Implemented by the CDP
/// page and by an in-memory fake in tests.
#[async_trait]
pub trait DomQuery {
    /// Geometry of the first element matching `selector`, if any.
    async fn query_selector(&mut self, selector: &str) -> Result<Option<ElementRect>>;

    /// Click the first element matching `selector`. Returns whether a
    /// matching element was found.
    async fn click_selector(&mut self, selector: &str) -> Result<bool>;

    /// Click the first visible button-like element whose text contains
    /// `text` (case-insensitive). Returns whether one was found.
    async fn click_button_with_text(&mut self, text: &str) -> Result<bool>;

    /// Visible text of every clickable element, in document order.
    async fn clickable_texts(&mut self) -> Result<Vec<String>>;

    /// Click the nth clickable element, pairing with `clickable_texts`.
    async fn click_clickable(&mut self, index: usize) -> Result<bool>;
}

/// Selector chain for a step: the declared legacy target first, then
/// derived fallbacks, then the two demo-button selectors that survive on
/// every page of the app shell.
pub fn fallback_selectors(step_id: &str, declared_target: Option<&str>) -> Vec<String> {
    let mut selectors = Vec::new();
    if let Some(target) = declared_target {
        selectors.push(target.to_string());
    }
    selectors.push(format!("[data-tour-step=\"{}\"]", step_id));
    selectors.push(format!("[data-tour=\"{}\"]", step_id));
    selectors.push(format!("#{}", step_id));
    selectors.push(format!(".{}", step_id));
    selectors.push(format!("[aria-label*=\"{}\"]", step_id));
    selectors.push("[data-testid=\"demo-accounts-button\"]".to_string());
    selectors.push("button.demo-accounts-button".to_string());
    selectors
}

/// Try each selector in order; first match wins. Returns the matching
/// selector together with its geometry so callers can re-address the
/// element later.
pub async fn locate<D: DomQuery + ?Sized>(
    dom: &mut D,
    selectors: &[String],
) -> Result<Option<(String, ElementRect)>> {
    for selector in selectors {
        if let Some(rect) = dom.query_selector(selector).await? {
            return Ok(Some((selector.clone(), rect)));
        }
    }
    Ok(None)
}

/// Demo-account roles in click priority order.
pub const DEMO_ROLE_PRIORITY: [&str; 4] =
    ["executive", "project executive", "project manager", "admin"];

/// Pick which clickable element looks like the demo account to sign in
/// with: role names in priority order, then anything account-like.
pub fn pick_demo_account(texts: &[String]) -> Option<usize> {
    let normalized: Vec<String> = texts.iter().map(|t| normalize_text(t)).collect();

    for role in DEMO_ROLE_PRIORITY {
        // "Project Executive" cards belong to the second tier, not the
        // plain "executive" tier they would otherwise substring-match.
        let index = normalized.iter().position(|t| {
            t.contains(role) && !(role == "executive" && t.contains("project executive"))
        });
        if let Some(index) = index {
            return Some(index);
        }
    }

    normalized
        .iter()
        .position(|t| t.contains('@') || t.contains("demo") || t.contains("account"))
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Lowercase and collapse runs of whitespace, so scans match rendered text
/// regardless of markup line breaks.
pub fn normalize_text(text: &str) -> String {
    WHITESPACE
        .replace_all(text.trim(), " ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeDom {
        elements: HashMap<String, ElementRect>,
        buttons: Vec<String>,
        clicked: Vec<String>,
        queried: Vec<String>,
    }

    impl FakeDom {
        fn with_element(mut self, selector: &str, rect: ElementRect) -> Self {
            self.elements.insert(selector.to_string(), rect);
            self
        }
    }

    #[async_trait]
    impl DomQuery for FakeDom {
        async fn query_selector(&mut self, selector: &str) -> Result<Option<ElementRect>> {
            self.queried.push(selector.to_string());
            Ok(self.elements.get(selector).copied())
        }

        async fn click_selector(&mut self, selector: &str) -> Result<bool> {
            if self.elements.contains_key(selector) {
                self.clicked.push(selector.to_string());
                Ok(true)
            } else {
                Ok(false)
            }
        }

        async fn click_button_with_text(&mut self, text: &str) -> Result<bool> {
            let needle = normalize_text(text);
            if self
                .buttons
                .iter()
                .any(|b| normalize_text(b).contains(&needle))
            {
                self.clicked.push(format!("text:{}", text));
                Ok(true)
            } else {
                Ok(false)
            }
        }

        async fn clickable_texts(&mut self) -> Result<Vec<String>> {
            Ok(self.buttons.clone())
        }

        async fn click_clickable(&mut self, index: usize) -> Result<bool> {
            match self.buttons.get(index) {
                Some(text) => {
                    self.clicked.push(format!("index:{}:{}", index, text));
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn rect() -> ElementRect {
        ElementRect {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 40.0,
        }
    }

    #[tokio::test]
    async fn declared_target_wins_when_present() {
        let mut dom = FakeDom::default()
            .with_element(".declared", rect())
            .with_element("#my-step", rect());

        let selectors = fallback_selectors("my-step", Some(".declared"));
        let (matched, _) = locate(&mut dom, &selectors).await.unwrap().unwrap();
        assert_eq!(matched, ".declared");
        assert_eq!(dom.queried, vec![".declared".to_string()]);
    }

    #[tokio::test]
    async fn chain_falls_through_to_derived_selectors() {
        let mut dom = FakeDom::default().with_element("[data-tour=\"my-step\"]", rect());

        let selectors = fallback_selectors("my-step", Some(".missing"));
        let (matched, _) = locate(&mut dom, &selectors).await.unwrap().unwrap();
        assert_eq!(matched, "[data-tour=\"my-step\"]");
        // The declared target and the data-tour-step derivation were tried first.
        assert_eq!(dom.queried.len(), 3);
    }

    #[tokio::test]
    async fn no_match_returns_none_after_full_chain() {
        let mut dom = FakeDom::default();

        let selectors = fallback_selectors("my-step", None);
        assert!(locate(&mut dom, &selectors).await.unwrap().is_none());
        // Every selector in the chain was attempted, demo buttons included.
        assert_eq!(dom.queried.len(), selectors.len());
        assert!(dom
            .queried
            .contains(&"button.demo-accounts-button".to_string()));
    }

    #[test]
    fn fallback_chain_order_is_stable() {
        let selectors = fallback_selectors("step-x", Some(".t"));
        assert_eq!(
            selectors,
            vec![
                ".t".to_string(),
                "[data-tour-step=\"step-x\"]".to_string(),
                "[data-tour=\"step-x\"]".to_string(),
                "#step-x".to_string(),
                ".step-x".to_string(),
                "[aria-label*=\"step-x\"]".to_string(),
                "[data-testid=\"demo-accounts-button\"]".to_string(),
                "button.demo-accounts-button".to_string(),
            ]
        );
    }

    #[test]
    fn demo_account_scan_respects_role_priority() {
        let texts = vec![
            "Sign in".to_string(),
            "Admin\nadmin@example.com".to_string(),
            "Project  Manager".to_string(),
            "Executive".to_string(),
        ];
        // "executive" outranks "project manager" and "admin".
        assert_eq!(pick_demo_account(&texts), Some(3));
    }

    #[test]
    fn demo_account_scan_keeps_project_roles_in_their_own_tier() {
        // A "Project Executive" card ahead of a plain "Executive" card must
        // not win the first tier.
        let texts = vec![
            "Project Executive".to_string(),
            "Executive\nexec@example.com".to_string(),
        ];
        assert_eq!(pick_demo_account(&texts), Some(1));

        // Without a plain executive, the project executive tier is live.
        let texts = vec!["Sign in".to_string(), "Project Executive".to_string()];
        assert_eq!(pick_demo_account(&texts), Some(1));
    }

    #[test]
    fn demo_account_scan_falls_back_to_account_like_text() {
        let texts = vec![
            "Forgot password?".to_string(),
            "jane.doe@example.com".to_string(),
        ];
        assert_eq!(pick_demo_account(&texts), Some(1));

        let nothing = vec!["Forgot password?".to_string()];
        assert_eq!(pick_demo_account(&nothing), None);
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_text("  Run\n  Payroll "), "run payroll");
    }

    #[tokio::test]
    async fn fake_dom_button_scan_is_case_insensitive() {
        let mut dom = FakeDom {
            buttons: vec!["View Demo Accounts".to_string()],
            ..Default::default()
        };
        assert!(dom.click_button_with_text("demo accounts").await.unwrap());
        assert!(!dom.click_button_with_text("sign out").await.unwrap());
    }
}
