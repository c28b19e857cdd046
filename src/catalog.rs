//! ## Structure
//! This module contains the data structures for the tour catalog.
//!
//! ```text
//! TourDefinition
//!   ├── id / name / description
//!   ├── user_roles: Option<Vec<String>>
//!   ├── page: Option<String>
//!   └── steps: Vec<TourStep>
//!       ├── id / title / description
//!       ├── screenshot_url
//!       ├── highlight_rect: Option<HighlightRect>
//!       ├── next_button / prev_button / show_skip
//!       └── content / target / placement   (legacy selector renderer)
//! ```
//!
//! Definitions are assembled once at startup and never mutated; the
//! validator is advisory and never blocks catalog use.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const VALID_PLACEMENTS: [&str; 5] = ["top", "bottom", "left", "right", "center"];

/// Pixel region in the reference viewport used to emphasise part of a
/// captured screenshot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlightRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TourStep {
    pub id: String,
    pub title: String,
    /// Display text; may contain simple markup for emphasis and line breaks.
    pub description: String,
    /// Pre-rendered image asset shown for this step; populated offline by the
    /// screenshot generator, never rendered at runtime.
    pub screenshot_url: String,
    pub highlight_rect: Option<HighlightRect>,
    pub next_button: Option<String>,
    pub prev_button: Option<String>,
    pub show_skip: Option<bool>,
    // Legacy fields for the old selector-based renderer. A step may carry
    // either the screenshot fields above or these, not necessarily both.
    pub content: Option<String>,
    pub target: Option<String>,
    pub placement: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TourDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<TourStep>,
    /// Role tags restricting which users see the tour.
    pub user_roles: Option<Vec<String>>,
    /// Application page the tour targets; also names the screenshot
    /// output directory.
    pub page: Option<String>,
}

impl TourDefinition {
    /// Directory slug for generated assets: the `page` tag when set,
    /// otherwise the tour id.
    pub fn page_slug(&self) -> &str {
        self.page.as_deref().unwrap_or(&self.id)
    }
}

/// Best-effort structural check over the whole catalog.
///
/// Returns human-readable warnings and never fails: a malformed tour is
/// still usable, consumers tolerate missing fields. The legacy
/// `content`/`target`/`placement` checks predate the screenshot-based step
/// format, so steps using only the new fields are always flagged; kept
/// as-is pending product clarification.
pub fn validate_all_tour_definitions(tours: &[TourDefinition]) -> Vec<String> {
    let mut warnings = Vec::new();

    for tour in tours {
        if tour.id.is_empty() {
            warnings.push(format!("Tour '{}' is missing an id", tour.name));
        }
        if tour.name.is_empty() {
            warnings.push(format!("Tour '{}' is missing a name", tour.id));
        }
        if tour.description.is_empty() {
            warnings.push(format!("Tour '{}' is missing a description", tour.id));
        }

        if tour.steps.is_empty() {
            warnings.push(format!("Tour '{}' has no steps", tour.id));
            continue;
        }

        for (index, step) in tour.steps.iter().enumerate() {
            let step_ref = format!("Tour '{}' step {}", tour.id, index + 1);

            if step.id.is_empty() {
                warnings.push(format!("{} is missing an id", step_ref));
            }
            if step.title.is_empty() {
                warnings.push(format!("{} is missing a title", step_ref));
            }
            if step.content.is_none() {
                warnings.push(format!("{} is missing content", step_ref));
            }
            if step.target.is_none() {
                warnings.push(format!("{} is missing a target selector", step_ref));
            }
            match &step.placement {
                None => {
                    warnings.push(format!("{} is missing a placement", step_ref));
                }
                Some(placement) if !VALID_PLACEMENTS.contains(&placement.as_str()) => {
                    warnings.push(format!(
                        "{} has invalid placement '{}' (must be one of {})",
                        step_ref,
                        placement,
                        VALID_PLACEMENTS.join("|")
                    ));
                }
                Some(_) => {}
            }
        }
    }

    if cfg!(debug_assertions) {
        for warning in &warnings {
            warn!("{}", warning);
        }
    }

    warnings
}
