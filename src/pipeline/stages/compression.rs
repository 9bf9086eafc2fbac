//! Content-encoding negotiation. Only the negotiation lives in the
//! pipeline; the codec is a delivery-side collaborator that reads the
//! negotiated encoding off the context.

use axum::http::header;
use futures_util::future::BoxFuture;

use crate::config::schema::CompressionConfig;
use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::{ContentEncoding, RequestContext};

pub struct CompressionStage {
    config: CompressionConfig,
}

impl CompressionStage {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }
}

impl Stage for CompressionStage {
    fn name(&self) -> &'static str {
        "compression"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            if self.config.enabled {
                let accepts_gzip = ctx
                    .headers
                    .get(header::ACCEPT_ENCODING)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.split(',').any(|e| e.trim().starts_with("gzip")));
                if accepts_gzip {
                    ctx.encoding = ContentEncoding::Gzip;
                }
            }
            StageFlow::Continue
        })
    }
}
