//! Fixed mapping from tour ids to application routes.

pub const DEFAULT_PATH: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/login";

/// Application path the generator navigates to for a given tour.
/// Unknown ids fall back to the dashboard.
pub fn page_path(tour_id: &str) -> &'static str {
    match tour_id {
        "login-demo-accounts" => LOGIN_PATH,
        "dashboard-overview" => "/dashboard",
        "personnel-directory" => "/hr/personnel",
        "timesheets-approval" => "/hr/timesheets",
        "payroll-processing" => "/hr/payroll",
        "expenses-review" => "/hr/expenses",
        "compliance-documents" => "/hr/compliance",
        "benefits-enrollment" => "/hr/benefits",
        "hr-settings" => "/hr/settings",
        _ => DEFAULT_PATH,
    }
}

/// Tours that start on the login page skip the authenticate step.
pub fn is_login_tour(tour_id: &str) -> bool {
    page_path(tour_id) == LOGIN_PATH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tours_map_to_their_pages() {
        assert_eq!(page_path("login-demo-accounts"), "/login");
        assert_eq!(page_path("payroll-processing"), "/hr/payroll");
    }

    #[test]
    fn unknown_tours_fall_back_to_dashboard() {
        assert_eq!(page_path("made-up-tour"), DEFAULT_PATH);
    }

    #[test]
    fn only_login_tours_are_login() {
        assert!(is_login_tour("login-demo-accounts"));
        assert!(!is_login_tour("personnel-directory"));
        assert!(!is_login_tour("made-up-tour"));
    }
}
