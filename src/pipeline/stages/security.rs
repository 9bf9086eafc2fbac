//! Request sanity checks: syntactically hostile requests are rejected
//! before any decoding or lookup work.

use axum::http::StatusCode;
use futures_util::future::BoxFuture;

use crate::http::reply;
use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;
use crate::security::limits;

pub struct SecurityStage;

impl Stage for SecurityStage {
    fn name(&self) -> &'static str {
        "security"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            if let Some(rule) = limits::path_violation(&ctx.path) {
                tracing::debug!(client = %ctx.client_ip, path = %ctx.raw_path, rule, "request rejected");
                return StageFlow::Stop(reply::text(StatusCode::BAD_REQUEST, "bad request"));
            }
            StageFlow::Continue
        })
    }
}
