//! The single page/tab reused across all steps.

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tracing::debug;

use super::{Browser, CdpError};
use crate::locator::{DomQuery, ElementRect};

/// Capture region in viewport pixels.
#[derive(Debug, Clone, Copy)]
pub struct Clip {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Element list used by both the text scan and the indexed click, so the
/// two stay in sync.
const CLICKABLE_SELECTOR: &str = "button, [role=\"button\"], a, [data-demo-account]";

const OUTLINE_STYLE: &str = "3px solid #2563eb";

pub struct Page {
    browser: Browser,
    session_id: String,
}

impl Page {
    pub(super) fn new(browser: Browser, session_id: String) -> Self {
        Self {
            browser,
            session_id,
        }
    }

    async fn call(&mut self, method: &str, params: Value) -> Result<Value, CdpError> {
        self.browser.call(Some(&self.session_id), method, params).await
    }

    pub async fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), CdpError> {
        self.call(
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": width,
                "height": height,
                "deviceScaleFactor": 1,
                "mobile": false,
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn navigate(&mut self, url: &str) -> Result<(), CdpError> {
        let result = self.call("Page.navigate", json!({"url": url})).await?;
        if let Some(error_text) = result["errorText"].as_str() {
            if !error_text.is_empty() {
                return Err(CdpError::Navigation {
                    url: url.to_string(),
                    reason: error_text.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Evaluate a script in the page, returning its value by JSON.
    pub async fn evaluate(&mut self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        if let Some(details) = result.get("exceptionDetails") {
            let text = details["exception"]["description"]
                .as_str()
                .or_else(|| details["text"].as_str())
                .unwrap_or("unknown script exception");
            return Err(CdpError::Protocol(format!("script threw: {}", text)));
        }
        Ok(result["result"]["value"].clone())
    }

    pub async fn current_path(&mut self) -> Result<String, CdpError> {
        let value = self.evaluate("window.location.pathname").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// PNG screenshot of the clip region, or of the full page when no clip
    /// is given.
    pub async fn capture_screenshot(&mut self, clip: Option<Clip>) -> Result<Vec<u8>, CdpError> {
        let params = match clip {
            Some(clip) => json!({
                "format": "png",
                "clip": {
                    "x": clip.x,
                    "y": clip.y,
                    "width": clip.width,
                    "height": clip.height,
                    "scale": 1,
                },
            }),
            None => json!({
                "format": "png",
                "captureBeyondViewport": true,
            }),
        };
        let result = self.call("Page.captureScreenshot", params).await?;
        let data = result["data"]
            .as_str()
            .ok_or_else(|| CdpError::Protocol("Page.captureScreenshot returned no data".to_string()))?;
        Ok(BASE64.decode(data)?)
    }

    /// Scroll the element into view and outline it, returning its settled
    /// geometry. `None` when the selector no longer matches.
    pub async fn prepare_element(&mut self, selector: &str) -> Result<Option<ElementRect>, CdpError> {
        let script = r#"
(() => {
  const el = document.querySelector(__SELECTOR__);
  if (!el) return null;
  el.scrollIntoView({block: 'center', inline: 'nearest'});
  el.style.outline = __OUTLINE__;
  const r = el.getBoundingClientRect();
  return {x: r.x, y: r.y, width: r.width, height: r.height};
})()
"#
        .replace("__SELECTOR__", &encode_js_string(selector)?)
        .replace("__OUTLINE__", &encode_js_string(OUTLINE_STYLE)?);

        let value = self.evaluate(&script).await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    pub async fn clear_element_outline(&mut self, selector: &str) -> Result<(), CdpError> {
        let script = r#"
(() => {
  const el = document.querySelector(__SELECTOR__);
  if (el) el.style.outline = '';
})()
"#
        .replace("__SELECTOR__", &encode_js_string(selector)?);
        self.evaluate(&script).await?;
        Ok(())
    }

    /// Wait until no loading indicator is visible, bounded by `timeout`.
    /// Absence of an indicator is not an error.
    pub async fn wait_for_loading_settled(&mut self, timeout: std::time::Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        let script = "document.querySelector('[data-loading], .loading-spinner, .skeleton') === null";
        loop {
            match self.evaluate(script).await {
                Ok(Value::Bool(true)) => return,
                Ok(_) => {}
                Err(error) => {
                    debug!("Loading indicator check failed: {}", error);
                    return;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("Loading indicator still present after {:?}", timeout);
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        }
    }

    /// Close the page's browser. The tool owns exactly one page, so page
    /// shutdown and browser shutdown coincide.
    pub async fn shutdown(self) -> Result<(), CdpError> {
        self.browser.close().await
    }
}

fn encode_js_string(value: &str) -> Result<String, CdpError> {
    Ok(serde_json::to_string(value)?)
}

#[async_trait]
impl DomQuery for Page {
    async fn query_selector(&mut self, selector: &str) -> Result<Option<ElementRect>> {
        let script = r#"
(() => {
  const el = document.querySelector(__SELECTOR__);
  if (!el) return null;
  const r = el.getBoundingClientRect();
  return {x: r.x, y: r.y, width: r.width, height: r.height};
})()
"#
        .replace("__SELECTOR__", &encode_js_string(selector)?);

        let value = self.evaluate(&script).await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn click_selector(&mut self, selector: &str) -> Result<bool> {
        let script = r#"
(() => {
  const el = document.querySelector(__SELECTOR__);
  if (!el) return false;
  el.scrollIntoView({block: 'center', inline: 'nearest'});
  el.click();
  return true;
})()
"#
        .replace("__SELECTOR__", &encode_js_string(selector)?);

        let value = self.evaluate(&script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click_button_with_text(&mut self, text: &str) -> Result<bool> {
        let script = r#"
(() => {
  const needle = __NEEDLE__.toLowerCase();
  const candidates = Array.from(document.querySelectorAll(__CLICKABLE__));
  for (const el of candidates) {
    if (el.offsetParent === null) continue;
    const text = (el.innerText || '').replace(/\s+/g, ' ').trim().toLowerCase();
    if (text.includes(needle)) { el.click(); return true; }
  }
  return false;
})()
"#
        .replace("__NEEDLE__", &encode_js_string(text)?)
        .replace("__CLICKABLE__", &encode_js_string(CLICKABLE_SELECTOR)?);

        let value = self.evaluate(&script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn clickable_texts(&mut self) -> Result<Vec<String>> {
        let script = r#"
(() => Array.from(document.querySelectorAll(__CLICKABLE__))
  .filter(el => el.offsetParent !== null)
  .map(el => (el.innerText || '').replace(/\s+/g, ' ').trim()))()
"#
        .replace("__CLICKABLE__", &encode_js_string(CLICKABLE_SELECTOR)?);

        let value = self.evaluate(&script).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    async fn click_clickable(&mut self, index: usize) -> Result<bool> {
        let script = r#"
(() => {
  const candidates = Array.from(document.querySelectorAll(__CLICKABLE__))
    .filter(el => el.offsetParent !== null);
  const el = candidates[__INDEX__];
  if (!el) return false;
  el.click();
  return true;
})()
"#
        .replace("__CLICKABLE__", &encode_js_string(CLICKABLE_SELECTOR)?)
        .replace("__INDEX__", &index.to_string());

        let value = self.evaluate(&script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}
