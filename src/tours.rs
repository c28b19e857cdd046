//! Built-in tour catalog for the HR & Payroll module, plus optional loading
//! of a catalog from a YAML file. Definitions are assembled once at startup
//! and treated as immutable afterwards.

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::info;

use crate::catalog::{HighlightRect, TourDefinition, TourStep};

pub static TOUR_DEFINITIONS: Lazy<Vec<TourDefinition>> = Lazy::new(|| {
    vec![
        login_demo_accounts(),
        dashboard_overview(),
        personnel_directory(),
        timesheets_approval(),
        payroll_processing(),
        expenses_review(),
        compliance_documents(),
        benefits_enrollment(),
        hr_settings(),
    ]
});

pub fn find_tour<'a>(tours: &'a [TourDefinition], id: &str) -> Option<&'a TourDefinition> {
    tours.iter().find(|t| t.id == id)
}

/// Load a catalog from a YAML file with the same schema as the built-in
/// definitions. Validation is the caller's concern.
pub fn load_catalog(path: &str) -> Result<Vec<TourDefinition>> {
    let content = std::fs::read_to_string(path)?;
    let tours: Vec<TourDefinition> = serde_yaml::from_str(&content)?;
    info!("Loaded {} tour definitions from {}", tours.len(), path);
    Ok(tours)
}

fn step(id: &str, title: &str, description: &str, screenshot_url: &str) -> TourStep {
    TourStep {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        screenshot_url: screenshot_url.to_string(),
        ..Default::default()
    }
}

fn rect(x: u32, y: u32, width: u32, height: u32) -> Option<HighlightRect> {
    Some(HighlightRect {
        x,
        y,
        width,
        height,
    })
}

fn login_demo_accounts() -> TourDefinition {
    TourDefinition {
        id: "login-demo-accounts".to_string(),
        name: "Signing in with a demo account".to_string(),
        description: "Explore the platform as any role using the built-in demo accounts"
            .to_string(),
        page: Some("login".to_string()),
        steps: vec![
            TourStep {
                show_skip: Some(true),
                next_button: Some("Show me".to_string()),
                ..step(
                    "welcome",
                    "Welcome",
                    "Welcome to the platform.<br/>This short tour shows how to sign in \
                     with a <b>demo account</b> so you can explore every role.",
                    "/tours/login/step-1.png",
                )
            },
            TourStep {
                highlight_rect: rect(488, 528, 304, 48),
                target: Some("[data-testid=\"demo-accounts-button\"]".to_string()),
                ..step(
                    "demo-accounts-button",
                    "Open the demo accounts",
                    "Click <b>View Demo Accounts</b> below the sign-in form to list the \
                     available roles.",
                    "/tours/login/step-2.png",
                )
            },
            TourStep {
                highlight_rect: rect(420, 240, 440, 360),
                ..step(
                    "role-selection",
                    "Pick a role",
                    "Each card is a pre-configured identity: Executive, Project Executive, \
                     Project Manager or Admin. Pick the one whose view you want to see.",
                    "/tours/login/step-3.png",
                )
            },
            step(
                "login-process",
                "You're in",
                "The platform signs you in and lands on the dashboard for that role. \
                 You can switch roles at any time by signing out.",
                "/tours/login/step-4.png",
            ),
        ],
        ..Default::default()
    }
}

fn dashboard_overview() -> TourDefinition {
    TourDefinition {
        id: "dashboard-overview".to_string(),
        name: "Dashboard overview".to_string(),
        description: "A quick orientation around the main dashboard".to_string(),
        page: Some("dashboard".to_string()),
        steps: vec![
            TourStep {
                show_skip: Some(true),
                ..step(
                    "kpi-cards",
                    "Your numbers at a glance",
                    "Headcount, open timesheets, pending expenses and the next payroll \
                     run are summarised in the cards along the top.",
                    "/tours/dashboard/step-1.png",
                )
            },
            TourStep {
                highlight_rect: rect(0, 64, 240, 736),
                ..step(
                    "navigation",
                    "Finding your way",
                    "The sidebar groups everything by area: HR, Payroll, Compliance and \
                     Settings. Your role decides which entries you see.",
                    "/tours/dashboard/step-2.png",
                )
            },
            step(
                "activity-feed",
                "Recent activity",
                "Approvals, document expiries and payroll events show up here as they \
                 happen across your projects.",
                "/tours/dashboard/step-3.png",
            ),
        ],
        ..Default::default()
    }
}

fn personnel_directory() -> TourDefinition {
    TourDefinition {
        id: "personnel-directory".to_string(),
        name: "Personnel directory".to_string(),
        description: "Browse, filter and manage employee records".to_string(),
        page: Some("personnel".to_string()),
        steps: vec![
            step(
                "directory-table",
                "The directory",
                "Every employee, contractor and subcontractor in one searchable table, \
                 with trade, project assignment and certification status.",
                "/tours/personnel/step-1.png",
            ),
            TourStep {
                highlight_rect: rect(1040, 128, 216, 40),
                ..step(
                    "filters",
                    "Filter by trade or project",
                    "Use the filter menu to narrow the directory down to a trade, a \
                     project site or an employment type.",
                    "/tours/personnel/step-2.png",
                )
            },
            TourStep {
                highlight_rect: rect(1180, 220, 80, 36),
                ..step(
                    "employee-actions",
                    "Row actions",
                    "The actions menu on each row opens the profile, timesheets and \
                     compliance documents for that person.",
                    "/tours/personnel/step-3.png",
                )
            },
        ],
        ..Default::default()
    }
}

fn timesheets_approval() -> TourDefinition {
    TourDefinition {
        id: "timesheets-approval".to_string(),
        name: "Approving timesheets".to_string(),
        description: "Review weekly timesheets and overtime before payroll".to_string(),
        page: Some("timesheets".to_string()),
        user_roles: Some(vec![
            "project-manager".to_string(),
            "project-executive".to_string(),
            "admin".to_string(),
        ]),
        steps: vec![
            step(
                "pending-queue",
                "Pending timesheets",
                "Timesheets waiting on you are listed first, grouped by project and \
                 week ending date.",
                "/tours/timesheets/step-1.png",
            ),
            TourStep {
                highlight_rect: rect(640, 300, 560, 220),
                ..step(
                    "daily-breakdown",
                    "Daily breakdown",
                    "Open a timesheet to see per-day hours, cost codes and the overtime \
                     forecast for the week.",
                    "/tours/timesheets/step-2.png",
                )
            },
            step(
                "approve-reject",
                "Approve or send back",
                "Approve in one click, or send the timesheet back with a note. \
                 Approved hours flow straight into the next payroll run.",
                "/tours/timesheets/step-3.png",
            ),
        ],
        ..Default::default()
    }
}

fn payroll_processing() -> TourDefinition {
    TourDefinition {
        id: "payroll-processing".to_string(),
        name: "Running payroll".to_string(),
        description: "From approved hours to pay stubs".to_string(),
        page: Some("payroll".to_string()),
        user_roles: Some(vec!["admin".to_string(), "executive".to_string()]),
        steps: vec![
            step(
                "pay-period",
                "The current pay period",
                "The payroll screen opens on the current period: gross, withholdings \
                 and net for every employee, driven by approved timesheets.",
                "/tours/payroll/step-1.png",
            ),
            TourStep {
                highlight_rect: rect(1016, 128, 240, 40),
                ..step(
                    "run-payroll-menu",
                    "Run payroll",
                    "The <b>Run Payroll</b> menu starts a draft run, a certified-payroll \
                     export or an off-cycle payment.",
                    "/tours/payroll/step-2.png",
                )
            },
            step(
                "review-totals",
                "Review before committing",
                "A draft run shows employer taxes, union deductions and per-project \
                 labour cost so you can review totals before committing.",
                "/tours/payroll/step-3.png",
            ),
            step(
                "pay-stubs",
                "Pay stubs",
                "Committed runs generate pay stubs that employees see in their own \
                 portal immediately.",
                "/tours/payroll/step-4.png",
            ),
        ],
        ..Default::default()
    }
}

fn expenses_review() -> TourDefinition {
    TourDefinition {
        id: "expenses-review".to_string(),
        name: "Reviewing expenses".to_string(),
        description: "Receipts, mileage and per-diem claims".to_string(),
        page: Some("expenses".to_string()),
        steps: vec![
            step(
                "expense-queue",
                "Submitted expenses",
                "Claims arrive here with their receipts attached, tagged to a project \
                 and cost code.",
                "/tours/expenses/step-1.png",
            ),
            TourStep {
                highlight_rect: rect(700, 260, 480, 320),
                ..step(
                    "receipt-preview",
                    "Receipt preview",
                    "Open a claim to see the receipt image next to the claimed amount; \
                     mismatches are the most common reason to send a claim back.",
                    "/tours/expenses/step-2.png",
                )
            },
            step(
                "reimbursement",
                "Reimbursement",
                "Approved claims are reimbursed with the next payroll run or as a \
                 separate payment, your choice per claim.",
                "/tours/expenses/step-3.png",
            ),
        ],
        ..Default::default()
    }
}

fn compliance_documents() -> TourDefinition {
    TourDefinition {
        id: "compliance-documents".to_string(),
        name: "Compliance documents".to_string(),
        description: "Certifications, licences and expiry tracking".to_string(),
        page: Some("compliance".to_string()),
        steps: vec![
            step(
                "document-register",
                "The register",
                "Safety certifications, trade licences and insurance documents per \
                 person, with status badges for valid, expiring and expired.",
                "/tours/compliance/step-1.png",
            ),
            TourStep {
                highlight_rect: rect(24, 128, 360, 40),
                ..step(
                    "expiry-filters",
                    "Expiring soon",
                    "Filter to documents expiring in the next 30, 60 or 90 days and \
                     notify the holders directly from the list.",
                    "/tours/compliance/step-2.png",
                )
            },
        ],
        ..Default::default()
    }
}

fn benefits_enrollment() -> TourDefinition {
    TourDefinition {
        id: "benefits-enrollment".to_string(),
        name: "Benefits enrollment".to_string(),
        description: "Plans, eligibility and open enrollment".to_string(),
        page: Some("benefits".to_string()),
        steps: vec![
            step(
                "plan-cards",
                "Available plans",
                "Medical, dental and retirement plans are presented as cards with \
                 employee and employer contributions side by side.",
                "/tours/benefits/step-1.png",
            ),
            step(
                "enrollment-status",
                "Who is enrolled",
                "The enrollment tab shows per-employee elections and flags anyone \
                 eligible but not yet enrolled during open enrollment.",
                "/tours/benefits/step-2.png",
            ),
        ],
        ..Default::default()
    }
}

fn hr_settings() -> TourDefinition {
    TourDefinition {
        id: "hr-settings".to_string(),
        name: "HR settings".to_string(),
        description: "Pay schedules, overtime rules and approval chains".to_string(),
        page: Some("settings".to_string()),
        user_roles: Some(vec!["admin".to_string()]),
        steps: vec![
            step(
                "settings-sections",
                "Settings sections",
                "Company-wide HR configuration lives here: pay schedules, overtime \
                 rules, expense policies and approval chains.",
                "/tours/settings/step-1.png",
            ),
            TourStep {
                highlight_rect: rect(280, 200, 680, 300),
                ..step(
                    "overtime-rules",
                    "Overtime rules",
                    "Overtime thresholds are set per state and per union agreement; \
                     timesheet forecasts use whichever rule applies to the project site.",
                    "/tours/settings/step-2.png",
                )
            },
        ],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_tour_by_id() {
        let tour = find_tour(&TOUR_DEFINITIONS, "payroll-processing").expect("tour exists");
        assert_eq!(tour.page_slug(), "payroll");
        assert!(find_tour(&TOUR_DEFINITIONS, "no-such-tour").is_none());
    }

    #[test]
    fn catalog_roundtrips_through_yaml() {
        let yaml_str = serde_yaml::to_string(&*TOUR_DEFINITIONS).unwrap();
        let parsed: Vec<TourDefinition> = serde_yaml::from_str(&yaml_str).unwrap();
        assert_eq!(parsed.len(), TOUR_DEFINITIONS.len());
        assert_eq!(parsed[0].id, TOUR_DEFINITIONS[0].id);
    }

    #[test]
    fn load_catalog_reads_yaml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("catalog.yaml");
        let yaml_str = r#"
- id: one-off
  name: One-off tour
  description: A tour loaded from disk
  steps:
    - id: only
      title: Only step
      description: The only step
      screenshot_url: /tours/one-off/step-1.png
"#;
        std::fs::write(&path, yaml_str).unwrap();

        let tours = load_catalog(path.to_str().unwrap()).expect("load");
        assert_eq!(tours.len(), 1);
        assert_eq!(tours[0].id, "one-off");
        assert_eq!(tours[0].page_slug(), "one-off");
    }
}
