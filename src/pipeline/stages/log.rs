//! Request logging. Placed before throttling so rate-limited requests are
//! still part of the audit trail, and after root resolution so the resolved
//! resource identity is what gets recorded.

use futures_util::future::BoxFuture;

use crate::observability::metrics;
use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;

pub struct LogStage;

impl Stage for LogStage {
    fn name(&self) -> &'static str {
        "log"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            tracing::info!(
                client = %ctx.client_ip,
                method = %ctx.method,
                path = %ctx.path,
                user = ctx.username().unwrap_or("-"),
                resource = ctx.resolved.as_ref().map(|r| r.root_prefix.as_str()).unwrap_or("-"),
                "request"
            );
            metrics::record_request(ctx.method.as_str());
            StageFlow::Continue
        })
    }
}
