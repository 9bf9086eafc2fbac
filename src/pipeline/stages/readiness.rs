//! Readiness gate. A misconfigured or not-yet-provisioned server fails
//! closed here, before any business logic runs.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::health::Readiness;
use crate::http::reply;
use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;

pub struct ReadinessStage {
    readiness: Arc<Readiness>,
}

impl ReadinessStage {
    pub fn new(readiness: Arc<Readiness>) -> Self {
        Self { readiness }
    }
}

impl Stage for ReadinessStage {
    fn name(&self) -> &'static str {
        "readiness"
    }

    fn process<'a>(&'a self, _ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            if self.readiness.ready() {
                StageFlow::Continue
            } else {
                StageFlow::Stop(reply::service_unavailable("server is not ready"))
            }
        })
    }
}
