//! Per-step UI interactions the generator performs before capturing.
//!
//! Some steps only look right with a menu or dropdown open. For those known
//! (tour id, step id) pairs we try an ordered list of CSS selectors and fall
//! back to scanning visible button text. Failure is logged, never fatal.

/// Candidates for the control that reveals the demo account list. Shared
/// between the sign-in flow and the login tour's role-selection step so
/// the two cannot drift apart.
pub const DEMO_ACCOUNTS_SELECTORS: [&str; 3] = [
    "[data-testid=\"demo-accounts-button\"]",
    "button.demo-accounts-button",
    ".login-form .demo-accounts-toggle",
];

pub struct StepInteraction {
    /// Selector candidates, tried in order.
    pub selectors: &'static [&'static str],
    /// Visible-text needle for the button scan fallback.
    pub button_text: &'static str,
}

pub fn step_interaction(tour_id: &str, step_id: &str) -> Option<StepInteraction> {
    match (tour_id, step_id) {
        ("login-demo-accounts", "role-selection") => Some(StepInteraction {
            selectors: &DEMO_ACCOUNTS_SELECTORS,
            button_text: "demo accounts",
        }),
        ("personnel-directory", "filters") => Some(StepInteraction {
            selectors: &[
                "[data-testid=\"personnel-filter-menu\"]",
                ".personnel-toolbar .filter-menu-trigger",
            ],
            button_text: "filter",
        }),
        ("personnel-directory", "employee-actions") => Some(StepInteraction {
            selectors: &[
                "[data-testid=\"row-actions\"]",
                ".personnel-table tbody tr:first-child .row-actions-trigger",
            ],
            button_text: "actions",
        }),
        ("payroll-processing", "run-payroll-menu") => Some(StepInteraction {
            selectors: &[
                "[data-testid=\"run-payroll-menu\"]",
                ".payroll-toolbar .run-payroll-trigger",
            ],
            button_text: "run payroll",
        }),
        ("compliance-documents", "expiry-filters") => Some(StepInteraction {
            selectors: &[
                "[data-testid=\"expiry-filter\"]",
                ".compliance-toolbar .expiry-filter-trigger",
            ],
            button_text: "expiring",
        }),
        _ => None,
    }
}
