//! Terminal dispatch: API routing first, static content delivery as the
//! fallback. Always stops; a chain that reaches past this stage was
//! assembled without it, which is a bootstrap defect.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::api::ApiRouter;
use crate::files::ContentService;
use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;

pub struct DispatchStage {
    api: Arc<ApiRouter>,
    content: Arc<ContentService>,
}

impl DispatchStage {
    pub fn new(api: Arc<ApiRouter>, content: Arc<ContentService>) -> Self {
        Self { api, content }
    }
}

impl Stage for DispatchStage {
    fn name(&self) -> &'static str {
        "dispatch"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            let response = if self.api.matches(&ctx.path) {
                self.api.dispatch(ctx).await
            } else {
                self.content.serve(ctx).await
            };
            StageFlow::Stop(response)
        })
    }
}
