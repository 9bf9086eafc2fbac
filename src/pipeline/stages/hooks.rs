//! Extension point. Runs after throttling and immediately before terminal
//! dispatch: extensions can intercept or augment the final response but
//! cannot bypass rate limiting.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;
use crate::plugins::HookRegistry;

pub struct HooksStage {
    registry: Arc<HookRegistry>,
}

impl HooksStage {
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self { registry }
    }
}

impl Stage for HooksStage {
    fn name(&self) -> &'static str {
        "hooks"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            match self.registry.dispatch(ctx).await {
                Some(response) => StageFlow::Stop(response),
                None => StageFlow::Continue,
            }
        })
    }
}
