//! HEAD handling. Records the flag and downgrades the method so terminal
//! stages run their lookup logic exactly as for GET; the transport strips
//! the body at response time. Placed after parameter decoding and before
//! anything that would produce a body.

use axum::http::Method;
use futures_util::future::BoxFuture;

use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;

pub struct HeadStage;

impl Stage for HeadStage {
    fn name(&self) -> &'static str {
        "head"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            if ctx.method == Method::HEAD {
                ctx.is_head = true;
                ctx.method = Method::GET;
            }
            StageFlow::Continue
        })
    }
}
