//! Virtual-root resolution. Maps the externally visible path to the
//! internal resource before logging and throttling, so both observe the
//! authoritative resource identity.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::files::RootMap;
use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;

pub struct RootsStage {
    roots: Arc<RootMap>,
}

impl RootsStage {
    pub fn new(roots: Arc<RootMap>) -> Self {
        Self { roots }
    }
}

impl Stage for RootsStage {
    fn name(&self) -> &'static str {
        "roots"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            ctx.resolved = self.roots.resolve(&ctx.path);
            StageFlow::Continue
        })
    }
}
