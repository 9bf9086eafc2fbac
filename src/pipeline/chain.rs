//! The ordered stage chain.
//!
//! A flat, registration-ordered sequence of stages. Each stage inspects and
//! mutates the request context, then either passes control onward or stops
//! the chain with a terminal response. There is no nesting and no
//! subclassing; composition happens in the bootstrap, once.

use std::sync::Arc;

use axum::response::Response;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::pipeline::context::RequestContext;

/// What a stage decided.
pub enum StageFlow {
    /// Pass the (possibly mutated) context to the next stage.
    Continue,
    /// Terminal: respond now, skip every later stage.
    Stop(Response),
}

impl std::fmt::Debug for StageFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageFlow::Continue => f.write_str("Continue"),
            StageFlow::Stop(_) => f.write_str("Stop(..)"),
        }
    }
}

/// One unit in the ordered request-processing pipeline.
pub trait Stage: Send + Sync + 'static {
    /// Stable name used for logging and order assertions.
    fn name(&self) -> &'static str;

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow>;
}

/// Chain misconfiguration: the traversal completed without any stage
/// producing a response. Every deployment must terminate in dispatch.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("no stage produced a response for {path:?}")]
    Unhandled { path: String },
}

/// Strictly ordered stage sequence. Invocation order is registration order,
/// always.
pub struct StageChain {
    stages: Vec<Arc<dyn Stage>>,
}

impl StageChain {
    pub fn builder() -> StageChainBuilder {
        StageChainBuilder { stages: Vec::new() }
    }

    /// Run the context through the chain. Halts at the first stage that
    /// stops; a traversal that falls off the end is a configuration defect.
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<Response, ChainError> {
        for stage in &self.stages {
            match stage.process(ctx).await {
                StageFlow::Continue => {}
                StageFlow::Stop(response) => {
                    tracing::trace!(stage = stage.name(), "chain stopped");
                    return Ok(response);
                }
            }
        }
        Err(ChainError::Unhandled { path: ctx.raw_path.clone() })
    }

    /// Names of all stages in invocation order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Builder used by the bootstrap to assemble the shipped order.
pub struct StageChainBuilder {
    stages: Vec<Arc<dyn Stage>>,
}

impl StageChainBuilder {
    pub fn stage<S: Stage>(mut self, stage: S) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn build(self) -> StageChain {
        StageChain { stages: self.stages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn context() -> RequestContext {
        RequestContext::new(
            "127.0.0.1:1234".parse().unwrap(),
            Method::GET,
            &"/test".parse().unwrap(),
            HeaderMap::new(),
            Bytes::new(),
            0,
        )
    }

    /// A test stage that records its invocation order.
    struct Tracking {
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
        stop: bool,
    }

    impl Stage for Tracking {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(&'a self, _ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
            Box::pin(async move {
                self.order.lock().unwrap().push(self.name);
                if self.stop {
                    let response = Response::builder()
                        .status(StatusCode::OK)
                        .body(axum::body::Body::from("stopped"))
                        .unwrap();
                    StageFlow::Stop(response)
                } else {
                    StageFlow::Continue
                }
            })
        }
    }

    #[tokio::test]
    async fn stages_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = StageChain::builder()
            .stage(Tracking { name: "first", order: order.clone(), stop: false })
            .stage(Tracking { name: "second", order: order.clone(), stop: false })
            .stage(Tracking { name: "third", order: order.clone(), stop: true })
            .build();

        let mut ctx = context();
        let response = chain.run(&mut ctx).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn stop_short_circuits_later_stages() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let invoked_after = Arc::new(AtomicUsize::new(0));

        struct Counting {
            count: Arc<AtomicUsize>,
        }
        impl Stage for Counting {
            fn name(&self) -> &'static str {
                "counting"
            }
            fn process<'a>(&'a self, _ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
                Box::pin(async move {
                    self.count.fetch_add(1, Ordering::SeqCst);
                    StageFlow::Continue
                })
            }
        }

        let chain = StageChain::builder()
            .stage(Tracking { name: "stopper", order: order.clone(), stop: true })
            .stage(Counting { count: invoked_after.clone() })
            .build();

        let mut ctx = context();
        chain.run(&mut ctx).await.unwrap();
        assert_eq!(invoked_after.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn completed_chain_without_stop_is_unhandled() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = StageChain::builder()
            .stage(Tracking { name: "only", order, stop: false })
            .build();

        let mut ctx = context();
        match chain.run(&mut ctx).await {
            Err(ChainError::Unhandled { path }) => assert_eq!(path, "/test"),
            Ok(_) => panic!("expected UnhandledRequest"),
        }
    }

    #[tokio::test]
    async fn empty_chain_is_unhandled() {
        let chain = StageChain::builder().build();
        let mut ctx = context();
        assert!(chain.run(&mut ctx).await.is_err());
    }
}
