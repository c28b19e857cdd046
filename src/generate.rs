//! Screenshot generation driver.
//!
//! One browser, one page, strictly sequential: tours one at a time, steps
//! in order. Every interaction is best-effort; a step only fails when no
//! capture strategy at all produces an image file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use colored::Colorize;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::catalog::{TourDefinition, TourStep};
use crate::cdp::page::Clip;
use crate::cdp::{Browser, Page};
use crate::common;
use crate::interactions::{self, StepInteraction};
use crate::locator::{self, DomQuery, ElementRect};
use crate::routes;

pub const VIEWPORT_WIDTH: u32 = 1280;
pub const VIEWPORT_HEIGHT: u32 = 800;

/// Padding around a located element's bounding box, in pixels.
const CAPTURE_PADDING: f64 = 16.0;

const SETTLE_DELAY: Duration = Duration::from_millis(2000);
const EXTRA_SETTLE_DELAY: Duration = Duration::from_millis(500);
const LOADING_TIMEOUT: Duration = Duration::from_secs(10);
const POST_CLICK_DELAY: Duration = Duration::from_millis(300);
const DEMO_ACCOUNTS_DELAY: Duration = Duration::from_millis(800);
const REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Outcome of one attempted step screenshot. Console reporting only.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub tour_id: String,
    pub step_index: usize,
    pub step_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub base_url: String,
    pub out_dir: PathBuf,
    pub headless: bool,
    pub step_delay: Duration,
}

pub struct ScreenshotGenerator {
    opts: GeneratorOptions,
    page: Page,
}

impl ScreenshotGenerator {
    pub async fn launch(opts: GeneratorOptions) -> Result<Self> {
        let browser = Browser::launch(opts.headless).await?;
        let mut page = browser.new_page().await?;
        page.set_viewport(VIEWPORT_WIDTH, VIEWPORT_HEIGHT).await?;
        Ok(Self { opts, page })
    }

    pub async fn close(self) -> Result<()> {
        self.page.shutdown().await?;
        Ok(())
    }

    pub async fn generate_all(
        &mut self,
        tours: &[TourDefinition],
    ) -> Result<IndexMap<String, Vec<StepResult>>> {
        let mut all = IndexMap::new();
        for tour in tours {
            let results = self.generate_tour(tour).await?;
            all.insert(tour.id.clone(), results);
        }
        Ok(all)
    }

    pub async fn generate_tour(&mut self, tour: &TourDefinition) -> Result<Vec<StepResult>> {
        info!(
            "Generating screenshots for tour '{}' ({} steps)",
            tour.id,
            tour.steps.len()
        );

        let mut results = Vec::new();
        for (index, step) in tour.steps.iter().enumerate() {
            if index == 0 && !routes::is_login_tour(&tour.id) {
                self.authenticate().await;
            }

            let result = self.generate_step_screenshot(tour, index, step).await;
            if result.success {
                info!(
                    "  step {}/{} '{}' -> {}",
                    index + 1,
                    tour.steps.len(),
                    step.id,
                    result.filepath.as_deref().unwrap_or("?")
                );
            } else {
                warn!(
                    "  step {}/{} '{}' failed: {}",
                    index + 1,
                    tour.steps.len(),
                    step.id,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);

            // Between steps, after the capture, so the delay never shifts
            // timing-sensitive interactions.
            if index + 1 < tour.steps.len() {
                sleep(self.opts.step_delay).await;
            }
        }

        if let Err(error) = self.write_manifest(tour, &results) {
            warn!("Could not write manifest for '{}': {}", tour.id, error);
        }

        Ok(results)
    }

    /// One step: navigate, stabilize, interact, then run the capture
    /// strategy against the live page.
    async fn generate_step_screenshot(
        &mut self,
        tour: &TourDefinition,
        step_index: usize,
        step: &TourStep,
    ) -> StepResult {
        if let Err(error) = self.prepare_page_for_step(tour, step).await {
            return StepResult {
                tour_id: tour.id.clone(),
                step_index,
                step_id: step.id.clone(),
                success: false,
                filepath: None,
                error: Some(error.to_string()),
            };
        }
        record_step_capture(&mut self.page, tour, step_index, step, &self.opts.out_dir).await
    }

    async fn prepare_page_for_step(&mut self, tour: &TourDefinition, step: &TourStep) -> Result<()> {
        let url = format!("{}{}", self.opts.base_url, routes::page_path(&tour.id));
        self.page.navigate(&url).await?;
        sleep(SETTLE_DELAY).await;
        sleep(EXTRA_SETTLE_DELAY).await;
        self.page.wait_for_loading_settled(LOADING_TIMEOUT).await;

        if let Some(interaction) = interactions::step_interaction(&tour.id, &step.id) {
            self.perform_interaction(&step.id, &interaction).await;
        }
        Ok(())
    }

    async fn perform_interaction(&mut self, step_id: &str, interaction: &StepInteraction) {
        for &selector in interaction.selectors {
            match self.page.click_selector(selector).await {
                Ok(true) => {
                    info!("Clicked '{}' for step '{}'", selector, step_id);
                    sleep(POST_CLICK_DELAY).await;
                    return;
                }
                Ok(false) => {}
                Err(error) => debug!("Click on '{}' failed: {}", selector, error),
            }
        }

        match self.page.click_button_with_text(interaction.button_text).await {
            Ok(true) => {
                info!(
                    "Clicked button matching '{}' for step '{}'",
                    interaction.button_text, step_id
                );
                sleep(POST_CLICK_DELAY).await;
            }
            Ok(false) => warn!("No control found for step '{}' interaction", step_id),
            Err(error) => warn!("Interaction for step '{}' failed: {}", step_id, error),
        }
    }

    /// Sign in as a representative demo user. Non-fatal throughout: a
    /// failed demo login degrades to a mock session written straight into
    /// local storage, so later navigation still sees an authenticated user.
    async fn authenticate(&mut self) {
        match self.try_demo_login().await {
            Ok(()) => {}
            Err(error) => {
                warn!(
                    "Demo login failed ({}), writing mock session to local storage",
                    error
                );
                if let Err(error) = self.write_mock_session().await {
                    warn!("Mock session bypass also failed: {}", error);
                }
            }
        }
    }

    async fn try_demo_login(&mut self) -> Result<()> {
        let url = format!("{}{}", self.opts.base_url, routes::LOGIN_PATH);
        self.page.navigate(&url).await?;
        sleep(SETTLE_DELAY).await;
        self.page.wait_for_loading_settled(LOADING_TIMEOUT).await;

        if !self.page.current_path().await?.starts_with(routes::LOGIN_PATH) {
            debug!("Already authenticated, skipping demo login");
            return Ok(());
        }

        let mut opened = false;
        for selector in interactions::DEMO_ACCOUNTS_SELECTORS {
            if self.page.click_selector(selector).await? {
                opened = true;
                break;
            }
        }
        if !opened {
            opened = self.page.click_button_with_text("demo account").await?;
        }
        if !opened {
            anyhow::bail!("show-demo-accounts control not found");
        }
        sleep(DEMO_ACCOUNTS_DELAY).await;

        let texts = self.page.clickable_texts().await?;
        let index = locator::pick_demo_account(&texts)
            .ok_or_else(|| anyhow!("no demo account candidates on the login page"))?;
        info!("Signing in as demo account '{}'", texts[index]);
        if !self.page.click_clickable(index).await? {
            anyhow::bail!("demo account element vanished before click");
        }

        sleep(REDIRECT_DELAY).await;
        if self.page.current_path().await?.starts_with(routes::LOGIN_PATH) {
            warn!("Still on the login page after demo sign-in; continuing anyway");
        }
        Ok(())
    }

    async fn write_mock_session(&mut self) -> Result<()> {
        const SCRIPT: &str = r#"
(() => {
  const user = {
    id: 'demo-admin',
    name: 'Demo Admin',
    role: 'admin',
    email: 'admin@demo.local',
  };
  localStorage.setItem('auth_user', JSON.stringify(user));
  localStorage.setItem('auth_token', 'demo-token');
  localStorage.setItem('refresh_token', 'demo-refresh-token');
  return true;
})()
"#;
        self.page.evaluate(SCRIPT).await?;
        Ok(())
    }

    fn write_manifest(&self, tour: &TourDefinition, results: &[StepResult]) -> Result<()> {
        let path = self
            .opts
            .out_dir
            .join(tour.page_slug())
            .join("manifest.json");
        let manifest = Manifest {
            tour: &tour.id,
            page: tour.page_slug(),
            results,
        };
        common::write_string_to_file(&path, &serde_json::to_string_pretty(&manifest)?)
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    tour: &'a str,
    page: &'a str,
    results: &'a [StepResult],
}

/// The capture surface of a page, layered over [`DomQuery`]. Implemented
/// by the CDP page and by an in-memory fake in tests, so the per-step
/// capture strategy can be exercised without a browser.
#[async_trait]
pub trait CapturePage: DomQuery {
    /// Outlined close-up of the first element matching `selector`, or
    /// `None` when the selector no longer matches anything.
    async fn capture_element(&mut self, selector: &str) -> Result<Option<Vec<u8>>>;

    /// Screenshot of the whole page.
    async fn capture_full_page(&mut self) -> Result<Vec<u8>>;
}

#[async_trait]
impl CapturePage for Page {
    async fn capture_element(&mut self, selector: &str) -> Result<Option<Vec<u8>>> {
        let rect = match self.prepare_element(selector).await? {
            Some(rect) => rect,
            None => return Ok(None),
        };
        let clip = expand_and_clamp(
            rect,
            CAPTURE_PADDING,
            f64::from(VIEWPORT_WIDTH),
            f64::from(VIEWPORT_HEIGHT),
        );
        let shot = self.capture_screenshot(Some(clip)).await;
        // Outline comes off even when the capture failed.
        if let Err(error) = self.clear_element_outline(selector).await {
            debug!("Could not clear outline on '{}': {}", selector, error);
        }
        Ok(Some(shot?))
    }

    async fn capture_full_page(&mut self) -> Result<Vec<u8>> {
        Ok(self.capture_screenshot(None).await?)
    }
}

/// Capture one step and record the outcome. A target selector that matches
/// nothing only degrades the capture to a full-page screenshot; the step
/// fails only when every capture strategy fails or the file cannot be
/// written.
async fn record_step_capture<P: CapturePage + ?Sized>(
    page: &mut P,
    tour: &TourDefinition,
    step_index: usize,
    step: &TourStep,
    out_dir: &Path,
) -> StepResult {
    let path = step_output_path(out_dir, tour, step_index + 1);
    let outcome = match capture_step_image(page, step).await {
        Ok(image) => common::write_bytes_to_file(&path, &image),
        Err(error) => Err(error),
    };
    let (success, error) = match outcome {
        Ok(()) => (true, None),
        Err(error) => (false, Some(error.to_string())),
    };

    StepResult {
        tour_id: tour.id.clone(),
        step_index,
        step_id: step.id.clone(),
        success,
        filepath: success.then(|| path.display().to_string()),
        error,
    }
}

/// Locate, then capture: the legacy target's selector chain when the step
/// declares one, an element close-up on a match, and a full-page
/// screenshot otherwise.
async fn capture_step_image<P: CapturePage + ?Sized>(
    page: &mut P,
    step: &TourStep,
) -> Result<Vec<u8>> {
    let mut located = None;
    if step.target.is_some() {
        let selectors = locator::fallback_selectors(&step.id, step.target.as_deref());
        match locator::locate(page, &selectors).await {
            Ok(matched) => located = matched,
            Err(error) => warn!("Locating target for step '{}' failed: {}", step.id, error),
        }
    }

    if let Some((selector, _)) = &located {
        match page.capture_element(selector).await {
            Ok(Some(image)) => return Ok(image),
            Ok(None) => warn!(
                "Element '{}' disappeared before capture, falling back to full page",
                selector
            ),
            Err(error) => warn!(
                "Element capture for '{}' failed ({}), falling back to full page",
                selector, error
            ),
        }
    }

    page.capture_full_page().await
}

/// Deterministic output path: `<out-dir>/<page ?? id>/step-<n>.png`,
/// 1-indexed. Reruns overwrite.
pub fn step_output_path(out_dir: &Path, tour: &TourDefinition, step_number: usize) -> PathBuf {
    out_dir
        .join(tour.page_slug())
        .join(format!("step-{}.png", step_number))
}

/// Expand an element's box by the capture padding and clamp it to the
/// viewport.
pub fn expand_and_clamp(
    rect: ElementRect,
    padding: f64,
    viewport_width: f64,
    viewport_height: f64,
) -> Clip {
    let x = (rect.x - padding).max(0.0);
    let y = (rect.y - padding).max(0.0);
    let width = (rect.width + padding * 2.0).min(viewport_width - x).max(1.0);
    let height = (rect.height + padding * 2.0)
        .min(viewport_height - y)
        .max(1.0);
    Clip {
        x,
        y,
        width,
        height,
    }
}

pub fn print_summary(results: &IndexMap<String, Vec<StepResult>>) {
    let mut total_ok = 0;
    let mut total_failed = 0;

    println!();
    println!("{}", "Screenshot generation summary".bold());
    for (tour_id, steps) in results {
        let ok = steps.iter().filter(|s| s.success).count();
        let failed = steps.len() - ok;
        total_ok += ok;
        total_failed += failed;

        let status = if failed == 0 {
            format!("{} ok", ok).green()
        } else {
            format!("{} ok, {} failed", ok, failed).red()
        };
        println!("  {:<28} {}", tour_id, status);

        for step in steps.iter().filter(|s| !s.success) {
            println!(
                "    step {} ({}): {}",
                step.step_index + 1,
                step.step_id,
                step.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!(
        "  {} steps total, {} ok, {} failed",
        total_ok + total_failed,
        total_ok,
        total_failed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TourDefinition;
    use std::collections::HashMap;

    fn tour_with_page(page: Option<&str>) -> TourDefinition {
        TourDefinition {
            id: "payroll-processing".to_string(),
            name: "Payroll".to_string(),
            description: "Payroll tour".to_string(),
            page: page.map(|p| p.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn output_path_uses_page_slug() {
        let tour = tour_with_page(Some("payroll"));
        let path = step_output_path(Path::new("public/tours"), &tour, 3);
        assert_eq!(path, PathBuf::from("public/tours/payroll/step-3.png"));
    }

    #[test]
    fn output_path_falls_back_to_tour_id() {
        let tour = tour_with_page(None);
        let path = step_output_path(Path::new("public/tours"), &tour, 1);
        assert_eq!(
            path,
            PathBuf::from("public/tours/payroll-processing/step-1.png")
        );
    }

    #[test]
    fn output_path_is_deterministic() {
        let tour = tour_with_page(Some("payroll"));
        let first = step_output_path(Path::new("out"), &tour, 2);
        let second = step_output_path(Path::new("out"), &tour, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn clip_expands_by_padding() {
        let rect = ElementRect {
            x: 100.0,
            y: 100.0,
            width: 200.0,
            height: 50.0,
        };
        let clip = expand_and_clamp(rect, 16.0, 1280.0, 800.0);
        assert_eq!(clip.x, 84.0);
        assert_eq!(clip.y, 84.0);
        assert_eq!(clip.width, 232.0);
        assert_eq!(clip.height, 82.0);
    }

    #[test]
    fn clip_clamps_to_viewport() {
        let rect = ElementRect {
            x: 4.0,
            y: 780.0,
            width: 1900.0,
            height: 60.0,
        };
        let clip = expand_and_clamp(rect, 16.0, 1280.0, 800.0);
        assert_eq!(clip.x, 0.0);
        assert_eq!(clip.width, 1280.0);
        assert_eq!(clip.y, 764.0);
        assert_eq!(clip.height, 36.0);
    }

    #[derive(Default)]
    struct FakePage {
        elements: HashMap<String, ElementRect>,
        element_capture_fails: bool,
    }

    #[async_trait]
    impl DomQuery for FakePage {
        async fn query_selector(&mut self, selector: &str) -> Result<Option<ElementRect>> {
            Ok(self.elements.get(selector).copied())
        }

        async fn click_selector(&mut self, _selector: &str) -> Result<bool> {
            Ok(false)
        }

        async fn click_button_with_text(&mut self, _text: &str) -> Result<bool> {
            Ok(false)
        }

        async fn clickable_texts(&mut self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn click_clickable(&mut self, _index: usize) -> Result<bool> {
            Ok(false)
        }
    }

    #[async_trait]
    impl CapturePage for FakePage {
        async fn capture_element(&mut self, selector: &str) -> Result<Option<Vec<u8>>> {
            if self.element_capture_fails {
                anyhow::bail!("element capture refused");
            }
            Ok(self
                .elements
                .get(selector)
                .map(|_| b"element-image".to_vec()))
        }

        async fn capture_full_page(&mut self) -> Result<Vec<u8>> {
            Ok(b"full-page-image".to_vec())
        }
    }

    fn step_with_target(target: &str) -> TourStep {
        TourStep {
            id: "run-payroll".to_string(),
            target: Some(target.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unmatched_target_degrades_to_full_page_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let tour = tour_with_page(Some("payroll"));
        let step = step_with_target(".selector-from-the-old-renderer");
        let mut page = FakePage::default();

        let result = record_step_capture(&mut page, &tour, 0, &step, dir.path()).await;

        assert!(result.success);
        assert!(result.error.is_none());
        let expected = step_output_path(dir.path(), &tour, 1);
        assert_eq!(result.filepath, Some(expected.display().to_string()));
        assert_eq!(std::fs::read(&expected).unwrap(), b"full-page-image");
    }

    #[tokio::test]
    async fn matched_target_captures_the_element() {
        let dir = tempfile::tempdir().unwrap();
        let tour = tour_with_page(Some("payroll"));
        let step = step_with_target(".run-payroll-button");
        let mut page = FakePage::default();
        page.elements.insert(
            ".run-payroll-button".to_string(),
            ElementRect {
                x: 10.0,
                y: 10.0,
                width: 120.0,
                height: 40.0,
            },
        );

        let result = record_step_capture(&mut page, &tour, 1, &step, dir.path()).await;

        assert!(result.success);
        let expected = step_output_path(dir.path(), &tour, 2);
        assert_eq!(std::fs::read(&expected).unwrap(), b"element-image");
    }

    #[tokio::test]
    async fn element_capture_failure_falls_back_to_full_page() {
        let dir = tempfile::tempdir().unwrap();
        let tour = tour_with_page(Some("payroll"));
        let step = step_with_target(".run-payroll-button");
        let mut page = FakePage {
            element_capture_fails: true,
            ..Default::default()
        };
        page.elements.insert(
            ".run-payroll-button".to_string(),
            ElementRect {
                x: 10.0,
                y: 10.0,
                width: 120.0,
                height: 40.0,
            },
        );

        let result = record_step_capture(&mut page, &tour, 0, &step, dir.path()).await;

        assert!(result.success);
        let expected = step_output_path(dir.path(), &tour, 1);
        assert_eq!(std::fs::read(&expected).unwrap(), b"full-page-image");
    }

    #[tokio::test]
    async fn write_failure_marks_the_step_failed() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the output directory should go makes the
        // write fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let tour = tour_with_page(Some("payroll"));
        let step = step_with_target(".gone");
        let mut page = FakePage::default();

        let result = record_step_capture(&mut page, &tour, 0, &step, &blocker).await;

        assert!(!result.success);
        assert!(result.filepath.is_none());
        assert!(result.error.is_some());
    }

    #[test]
    fn step_result_serializes_without_null_fields() {
        let result = StepResult {
            tour_id: "t".to_string(),
            step_index: 0,
            step_id: "s".to_string(),
            success: false,
            filepath: None,
            error: Some("navigation failed".to_string()),
        };
        let encoded = serde_json::to_string(&result).unwrap();
        assert!(!encoded.contains("filepath"));
        assert!(encoded.contains("navigation failed"));
    }
}
