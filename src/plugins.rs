//! Request extension hooks.
//!
//! Extensions observe the request immediately before terminal dispatch:
//! after throttling (they cannot bypass rate limiting) and after parameter
//! decoding (they see, and may rewrite, fully decoded parameters). The
//! contract is bounded and synchronous in pipeline terms: a hook may veto
//! with its own response or transform the context, and must return promptly.

use std::sync::Arc;

use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::pipeline::context::RequestContext;

/// What a hook decided.
pub enum HookFlow {
    Continue,
    /// Replace the terminal dispatch with this response.
    Override(Response),
}

/// A registered extension point.
pub trait RequestHook: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn on_request<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HookFlow>;
}

/// Ordered hook registry. Hooks run in registration order; the first
/// override wins and later hooks are not consulted.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn RequestHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H: RequestHook>(&mut self, hook: H) {
        self.hooks.push(Arc::new(hook));
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run all hooks against the context. Returns the overriding response,
    /// if any hook produced one.
    pub async fn dispatch(&self, ctx: &mut RequestContext) -> Option<Response> {
        for hook in &self.hooks {
            match hook.on_request(ctx).await {
                HookFlow::Continue => {}
                HookFlow::Override(response) => {
                    tracing::debug!(hook = hook.name(), "request overridden by extension");
                    return Some(response);
                }
            }
        }
        None
    }
}
