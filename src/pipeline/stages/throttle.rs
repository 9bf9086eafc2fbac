//! Admission control. The granted permit rides in the context and is
//! released when the context drops, so disconnect unwinding cannot leak a
//! slot. Runs after logging: rejected requests are still recorded.

use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;

use crate::http::reply;
use crate::observability::metrics;
use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;
use crate::security::{Admission, ThrottleGate};

pub struct ThrottleStage {
    gate: Arc<dyn ThrottleGate>,
}

impl ThrottleStage {
    pub fn new(gate: Arc<dyn ThrottleGate>) -> Self {
        Self { gate }
    }
}

impl Stage for ThrottleStage {
    fn name(&self) -> &'static str {
        "throttle"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            match self.gate.admit(ctx.client_ip, ctx.username()) {
                Admission::Allowed(permit) => {
                    ctx.permit = Some(permit);
                    StageFlow::Continue
                }
                Admission::Rejected(reason) => {
                    tracing::debug!(client = %ctx.client_ip, %reason, "request throttled");
                    metrics::record_throttled(reason);
                    StageFlow::Stop(reply::text(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded"))
                }
            }
        })
    }
}
