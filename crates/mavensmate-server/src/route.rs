//! Route classification.
//!
//! Every request path falls into exactly one [`RouteCategory`], decided once
//! before the project gate runs. Matching is on whole path segments so that
//! `/app/project/1/settingsfoo` is not mistaken for the settings page.

/// `command` query value that starts OAuth for a project
pub const OAUTH_PROJECT_COMMAND: &str = "oauth-project";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteCategory {
    /// `/app/static/...` assets
    Static,
    /// Re-authentication page
    AuthPage,
    /// Project settings page
    SettingsPage,
    /// Headless command execution
    ExecuteApi,
    /// Headless command status polling
    StatusApi,
    /// Any other interactive page under `/app/`
    AppPage,
    Other,
}

impl RouteCategory {
    pub fn classify(path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if segments.starts_with(&["app", "static"]) {
            return Self::Static;
        }

        // The project id segment is data, never a route word
        let route_segments = if segments.starts_with(&["app", "project"]) {
            segments.get(3..).unwrap_or_default()
        } else {
            &segments[..]
        };

        // API segments win over the app namespace: they are called headless
        if route_segments.contains(&"execute") {
            return Self::ExecuteApi;
        }
        if route_segments.contains(&"status") {
            return Self::StatusApi;
        }
        if route_segments.contains(&"auth") {
            return Self::AuthPage;
        }
        if route_segments.contains(&"settings") {
            return Self::SettingsPage;
        }
        if segments.first() == Some(&"app") {
            return Self::AppPage;
        }

        Self::Other
    }

    /// Requests made by API clients that cannot follow a redirect
    pub fn is_api(self) -> bool {
        matches!(self, Self::ExecuteApi | Self::StatusApi)
    }
}

/// Location of the re-authentication page for a project
pub fn auth_location(project_id: &str) -> String {
    format!("/app/project/{}/auth?pid={}", project_id, project_id)
}

/// Extract the id from `/app/project/{id}/...`
pub fn project_id_from_path(path: &str) -> Option<&str> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    match (segments.next(), segments.next(), segments.next()) {
        (Some("app"), Some("project"), Some(id)) => Some(id),
        _ => None,
    }
}
