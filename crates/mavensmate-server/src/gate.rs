//! Project attachment gate.
//!
//! Resolves the project a request refers to, loading it into the cache on
//! first use, and decides whether the request continues, is redirected to
//! re-authenticate, or is rejected.

use axum::http::StatusCode;
use mavensmate_core::{CoreError, Project, ProjectCache, ProjectLifecycle, ProjectLocator};
use std::path::PathBuf;
use std::sync::Arc;

use crate::route::{auth_location, RouteCategory, OAUTH_PROJECT_COMMAND};

/// Message returned to API callers whose project needs re-authentication
pub const REAUTH_REQUIRED_MESSAGE: &str =
    "Could not complete the requested operation. Project requires re-authentication.";

/// What the gate needs to know about a request
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub route: RouteCategory,
    pub project_id: Option<&'a str>,
    pub command: Option<&'a str>,
}

/// Routing outcome for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAction {
    Continue,
    Redirect(String),
    Reject { status: StatusCode, message: String },
}

/// Outcome plus the project attached to the request, if any
#[derive(Debug, Clone)]
pub struct GateDecision {
    pub action: GateAction,
    pub project: Option<Arc<Project>>,
}

impl GateDecision {
    fn pass() -> Self {
        Self {
            action: GateAction::Continue,
            project: None,
        }
    }

    fn reject(message: String) -> Self {
        Self {
            action: GateAction::Reject {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message,
            },
            project: None,
        }
    }
}

pub struct ProjectGate {
    cache: Arc<ProjectCache>,
    locator: Arc<dyn ProjectLocator>,
    lifecycle: Arc<dyn ProjectLifecycle>,
}

impl ProjectGate {
    pub fn new(
        cache: Arc<ProjectCache>,
        locator: Arc<dyn ProjectLocator>,
        lifecycle: Arc<dyn ProjectLifecycle>,
    ) -> Self {
        Self {
            cache,
            locator,
            lifecycle,
        }
    }

    pub fn cache(&self) -> &Arc<ProjectCache> {
        &self.cache
    }

    /// Decide what happens to a request
    pub async fn handle(&self, request: &GateRequest<'_>) -> GateDecision {
        if request.route == RouteCategory::Static {
            return GateDecision::pass();
        }

        let Some(project_id) = request.project_id else {
            return GateDecision::pass();
        };

        let project = match self.cache.get(project_id) {
            Some(project) => {
                tracing::debug!(id = %project_id, name = %project.name, "Project is known to the server");
                project
            }
            None => {
                tracing::debug!(id = %project_id, "Attempting to attach project to request");
                match self.add_project(project_id).await {
                    Ok(project) => project,
                    Err(e) => {
                        tracing::error!(id = %project_id, error = %e, "Failed to add project to server");
                        return GateDecision::reject(format!("Error initializing project: {}", e));
                    }
                }
            }
        };

        let action = if project.has_invalid_salesforce_connection {
            auth_gate(request, project_id)
        } else {
            GateAction::Continue
        };

        GateDecision {
            action,
            project: Some(project),
        }
    }

    /// Load a project into the cache by id
    async fn add_project(&self, project_id: &str) -> Result<Arc<Project>, CoreError> {
        self.cache
            .get_or_try_load(project_id, || async move {
                let path = self.prepare_project_dir(project_id).await?;

                tracing::info!(id = %project_id, path = ?path, "Adding project");
                let project = self.lifecycle.initialize(&path).await?;
                if project.id != project_id {
                    return Err(CoreError::InitializationFailure(format!(
                        "project at {} has id {} but {} was requested",
                        path.display(),
                        project.id,
                        project_id
                    )));
                }
                if project.has_invalid_salesforce_connection {
                    tracing::warn!(id = %project_id, "Project requiring re-authentication added to server");
                }
                Ok(project)
            })
            .await
    }

    /// Find the project directory and bring it to the current layout.
    ///
    /// Runs on the blocking pool: both steps are synchronous filesystem work.
    async fn prepare_project_dir(&self, project_id: &str) -> Result<PathBuf, CoreError> {
        let locator = self.locator.clone();
        let lifecycle = self.lifecycle.clone();
        let id = project_id.to_string();

        tokio::task::spawn_blocking(move || {
            let path = locator
                .find_project_path(&id)
                .ok_or_else(|| CoreError::ProjectNotFound(id.clone()))?;

            if lifecycle.needs_upgrade(&path) {
                if let Err(e) = lifecycle.upgrade(&path) {
                    tracing::warn!(path = ?path, error = %e, "Project upgrade failed");
                }
            }

            Ok(path)
        })
        .await
        .map_err(|e| CoreError::InitializationFailure(e.to_string()))?
    }
}

/// Routing for a project whose stored credentials are unusable
fn auth_gate(request: &GateRequest<'_>, project_id: &str) -> GateAction {
    match request.route {
        RouteCategory::AppPage => {
            tracing::info!(id = %project_id, "Project requires authentication, redirecting to auth endpoint");
            GateAction::Redirect(auth_location(project_id))
        }
        route if route.is_api() && request.command != Some(OAUTH_PROJECT_COMMAND) => {
            tracing::error!(id = %project_id, "Requested operation requires re-authentication");
            GateAction::Reject {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: REAUTH_REQUIRED_MESSAGE.to_string(),
            }
        }
        _ => GateAction::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mavensmate_core::FsProjectLifecycle;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Lifecycle double with a failing upgrade and a fixed initialized project
    struct ScriptedLifecycle {
        project: Project,
        upgrades: AtomicUsize,
        initializations: AtomicUsize,
    }

    impl ScriptedLifecycle {
        fn new(project: Project) -> Self {
            Self {
                project,
                upgrades: AtomicUsize::new(0),
                initializations: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProjectLifecycle for ScriptedLifecycle {
        fn needs_upgrade(&self, _path: &Path) -> bool {
            true
        }

        fn upgrade(&self, _path: &Path) -> Result<(), CoreError> {
            self.upgrades.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::InitializationFailure("read-only workspace".to_string()))
        }

        async fn initialize(&self, _path: &Path) -> Result<Project, CoreError> {
            self.initializations.fetch_add(1, Ordering::SeqCst);
            Ok(self.project.clone())
        }
    }

    struct CountingLocator {
        path: Option<PathBuf>,
        calls: AtomicUsize,
    }

    impl ProjectLocator for CountingLocator {
        fn find_project_path(&self, _id: &str) -> Option<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.path.clone()
        }
    }

    fn cached_project(id: &str, invalid: bool) -> Project {
        Project {
            id: id.to_string(),
            name: "Cached".to_string(),
            path: PathBuf::from("/ws/cached"),
            has_invalid_salesforce_connection: invalid,
        }
    }

    async fn gate_with_cached(project: Project) -> (ProjectGate, Arc<CountingLocator>) {
        let cache = Arc::new(ProjectCache::new());
        let id = project.id.clone();
        cache
            .get_or_try_load(&id, || async move { Ok(project) })
            .await
            .unwrap();
        let locator = Arc::new(CountingLocator {
            path: None,
            calls: AtomicUsize::new(0),
        });
        let gate = ProjectGate::new(cache, locator.clone(), Arc::new(FsProjectLifecycle::new()));
        (gate, locator)
    }

    fn request<'a>(path: &str, id: Option<&'a str>, command: Option<&'a str>) -> GateRequest<'a> {
        GateRequest {
            route: RouteCategory::classify(path),
            project_id: id,
            command,
        }
    }

    #[tokio::test]
    async fn test_static_passes_without_lookup() {
        let (gate, locator) = gate_with_cached(cached_project("other", true)).await;
        let decision = gate
            .handle(&request("/app/static/app.js", Some("missing"), None))
            .await;
        assert_eq!(decision.action, GateAction::Continue);
        assert!(decision.project.is_none());
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_project_id_passes() {
        let (gate, locator) = gate_with_cached(cached_project("123", true)).await;
        let decision = gate.handle(&request("/app/project/123/foo", None, None)).await;
        assert_eq!(decision.action, GateAction::Continue);
        assert!(decision.project.is_none());
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_valid_project_attached() {
        let (gate, locator) = gate_with_cached(cached_project("123", false)).await;
        let decision = gate
            .handle(&request("/app/project/123/foo", Some("123"), None))
            .await;
        assert_eq!(decision.action, GateAction::Continue);
        let attached = decision.project.unwrap();
        assert!(Arc::ptr_eq(&attached, &gate.cache().get("123").unwrap()));
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_invalid_project_policy() {
        let (gate, locator) = gate_with_cached(cached_project("123", true)).await;

        let page = gate
            .handle(&request("/app/project/123/foo", Some("123"), None))
            .await;
        assert_eq!(
            page.action,
            GateAction::Redirect("/app/project/123/auth?pid=123".to_string())
        );
        assert!(page.project.is_some());

        let execute = gate
            .handle(&request("/app/project/123/execute", Some("123"), Some("save")))
            .await;
        assert_eq!(
            execute.action,
            GateAction::Reject {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: REAUTH_REQUIRED_MESSAGE.to_string(),
            }
        );

        let oauth = gate
            .handle(&request(
                "/app/project/123/execute",
                Some("123"),
                Some("oauth-project"),
            ))
            .await;
        assert_eq!(oauth.action, GateAction::Continue);

        let settings = gate
            .handle(&request("/app/project/123/settings", Some("123"), None))
            .await;
        assert_eq!(settings.action, GateAction::Continue);

        let auth = gate
            .handle(&request("/app/project/123/auth", Some("123"), None))
            .await;
        assert_eq!(auth.action, GateAction::Continue);

        let status = gate.handle(&request("/status", Some("123"), None)).await;
        assert!(matches!(status.action, GateAction::Reject { .. }));

        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_project_rejected() {
        let cache = Arc::new(ProjectCache::new());
        let locator = Arc::new(CountingLocator {
            path: None,
            calls: AtomicUsize::new(0),
        });
        let gate = ProjectGate::new(cache.clone(), locator.clone(), Arc::new(FsProjectLifecycle::new()));

        let decision = gate
            .handle(&request("/app/project/ghost/foo", Some("ghost"), None))
            .await;
        match decision.action {
            GateAction::Reject { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(message.contains("ghost"));
                assert!(message.starts_with("Error initializing project:"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(cache.is_empty());
        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolved_project_cached_once() {
        let ws = tempfile::tempdir().unwrap();
        let root = ws.path().join("acme");
        write_project(&root, "acme-id", true);

        let cache = Arc::new(ProjectCache::new());
        let locator = Arc::new(CountingLocator {
            path: Some(root.clone()),
            calls: AtomicUsize::new(0),
        });
        let gate = ProjectGate::new(cache.clone(), locator.clone(), Arc::new(FsProjectLifecycle::new()));

        let req = request("/app/project/acme-id/foo", Some("acme-id"), None);
        let first = gate.handle(&req).await;
        let second = gate.handle(&req).await;

        assert_eq!(first.action, GateAction::Continue);
        assert_eq!(first.action, second.action);
        assert_eq!(first.project.unwrap().path, root);
        assert_eq!(cache.ids(), vec!["acme-id".to_string()]);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialization_failure_rejected() {
        let ws = tempfile::tempdir().unwrap();
        let root = ws.path().join("broken");
        std::fs::create_dir_all(&root).unwrap();

        let cache = Arc::new(ProjectCache::new());
        let locator = Arc::new(CountingLocator {
            path: Some(root),
            calls: AtomicUsize::new(0),
        });
        let gate = ProjectGate::new(cache.clone(), locator, Arc::new(FsProjectLifecycle::new()));

        let decision = gate
            .handle(&request("/app/project/broken/foo", Some("broken"), None))
            .await;
        assert!(matches!(
            decision.action,
            GateAction::Reject { status: StatusCode::INTERNAL_SERVER_ERROR, .. }
        ));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failed_upgrade_still_initializes() {
        let lifecycle = Arc::new(ScriptedLifecycle::new(cached_project("legacy", false)));
        let locator = Arc::new(CountingLocator {
            path: Some(PathBuf::from("/ws/legacy")),
            calls: AtomicUsize::new(0),
        });
        let gate = ProjectGate::new(Arc::new(ProjectCache::new()), locator, lifecycle.clone());

        let decision = gate
            .handle(&request("/app/project/legacy/home", Some("legacy"), None))
            .await;

        assert_eq!(decision.action, GateAction::Continue);
        assert_eq!(decision.project.unwrap().id, "legacy");
        assert_eq!(lifecycle.upgrades.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.initializations.load(Ordering::SeqCst), 1);
        assert!(gate.cache().get("legacy").is_some());
    }

    #[tokio::test]
    async fn test_mismatched_project_id_rejected() {
        let lifecycle = Arc::new(ScriptedLifecycle::new(cached_project("other-id", false)));
        let locator = Arc::new(CountingLocator {
            path: Some(PathBuf::from("/ws/mixed")),
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(ProjectCache::new());
        let gate = ProjectGate::new(cache.clone(), locator, lifecycle);

        let decision = gate
            .handle(&request("/app/project/wanted/home", Some("wanted"), None))
            .await;

        match decision.action {
            GateAction::Reject { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(message.contains("other-id"));
                assert!(message.contains("wanted"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(cache.get("wanted").is_none());
        assert!(cache.get("other-id").is_none());
    }

    #[tokio::test]
    async fn test_project_id_named_like_route_word_redirects() {
        for id in ["auth", "settings", "status"] {
            let (gate, _) = gate_with_cached(cached_project(id, true)).await;
            let path = format!("/app/project/{}/foo", id);
            let decision = gate.handle(&request(&path, Some(id), None)).await;
            assert_eq!(decision.action, GateAction::Redirect(auth_location(id)));
        }
    }

    fn write_project(root: &Path, id: &str, with_credentials: bool) {
        std::fs::create_dir_all(root.join(".mavensmate")).unwrap();
        std::fs::write(
            root.join(".mavensmate/project.json"),
            format!(r#"{{"id":"{}"}}"#, id),
        )
        .unwrap();
        if with_credentials {
            std::fs::write(
                root.join(".mavensmate/credentials.json"),
                r#"{"accessToken":"token"}"#,
            )
            .unwrap();
        }
    }
}
