//! Session resolution. Runs first: every stage after it may ask "who is
//! asking" and must get a consistent answer.

use std::sync::Arc;

use axum::http::header;
use futures_util::future::BoxFuture;

use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;
use crate::sessions::SessionStore;

pub struct SessionStage {
    sessions: Arc<SessionStore>,
}

impl SessionStage {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }
}

impl Stage for SessionStage {
    fn name(&self) -> &'static str {
        "session"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            let cookie = ctx.headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
            ctx.session = self.sessions.resolve(cookie);
            StageFlow::Continue
        })
    }
}
