//! MavensMate Server
//!
//! Local HTTP companion server for MavensMate. Requests naming a project are
//! routed through a gate that loads the project from the configured
//! workspaces and sends clients with stale credentials to re-authenticate.

pub mod gate;
mod handlers;
pub mod middleware;
pub mod route;
pub mod server;
mod signals;

pub use gate::{GateAction, GateDecision, GateRequest, ProjectGate};
pub use middleware::{AttachedProject, RequestedProjectId};
pub use route::RouteCategory;
pub use server::{build_router, AppState, Server};
