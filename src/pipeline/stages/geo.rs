//! Address filtering. Runs before compression and parameter decoding so a
//! rejected request costs as little as possible.

use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;

use crate::http::reply;
use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;
use crate::security::GeoGate;

pub struct GeoStage {
    gate: Arc<dyn GeoGate>,
}

impl GeoStage {
    pub fn new(gate: Arc<dyn GeoGate>) -> Self {
        Self { gate }
    }
}

impl Stage for GeoStage {
    fn name(&self) -> &'static str {
        "geo"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            if self.gate.is_allowed(ctx.client_ip) {
                StageFlow::Continue
            } else {
                tracing::debug!(client = %ctx.client_ip, "address rejected by filter");
                StageFlow::Stop(reply::text(StatusCode::FORBIDDEN, "forbidden"))
            }
        })
    }
}
