//! API dispatch.
//!
//! API calls live under a configured path prefix; the command name is the
//! path segment after it, parameters arrive decoded in the request context.
//! Unknown commands answer 404 but still terminate the chain.

pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::Response;

use crate::auth::{CredentialStore, SrpParameters};
use crate::health::Readiness;
use crate::http::reply;
use crate::pipeline::context::RequestContext;
use crate::sessions::SessionStore;

/// Collaborators the handlers work against.
pub struct ApiEnv {
    pub sessions: Arc<SessionStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub srp: SrpParameters,
    pub readiness: Arc<Readiness>,
    pub started: Instant,
}

/// Name-based API router mounted by the dispatch stage.
pub struct ApiRouter {
    prefix: String,
    env: ApiEnv,
}

impl ApiRouter {
    pub fn new(prefix: String, env: ApiEnv) -> Self {
        Self { prefix, env }
    }

    /// Whether a decoded path addresses the API mount.
    pub fn matches(&self, path: &str) -> bool {
        path == self.prefix || path.strip_prefix(&self.prefix).is_some_and(|r| r.starts_with('/'))
    }

    pub async fn dispatch(&self, ctx: &mut RequestContext) -> Response {
        let command = ctx
            .path
            .strip_prefix(&self.prefix)
            .map(|r| r.trim_start_matches('/'))
            .unwrap_or_default()
            .to_string();

        match command.as_str() {
            "login" => handlers::login(&self.env, ctx).await,
            "logout" => handlers::logout(&self.env, ctx).await,
            "get_status" => handlers::get_status(&self.env, ctx).await,
            "change_my_srp" => handlers::change_my_srp(&self.env, ctx).await,
            _ => reply::json(
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": "unknown API command" }),
            ),
        }
    }
}
