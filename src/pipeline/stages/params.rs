//! Parameter decoding. Query string first, then a JSON body when one is
//! present; body values win. Runs before the extension hooks so they
//! observe fully decoded parameters and may still rewrite them.

use axum::http::{header, StatusCode};
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::http::reply;
use crate::pipeline::chain::{Stage, StageFlow};
use crate::pipeline::context::RequestContext;

pub struct ParamsStage;

impl Stage for ParamsStage {
    fn name(&self) -> &'static str {
        "params"
    }

    fn process<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, StageFlow> {
        Box::pin(async move {
            if let Some(query) = &ctx.query {
                for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                    ctx.params.insert(key.into_owned(), Value::String(value.into_owned()));
                }
            }

            let is_json = ctx
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("application/json"));
            if is_json && !ctx.body.is_empty() {
                match serde_json::from_slice::<Value>(&ctx.body) {
                    Ok(Value::Object(map)) => {
                        for (key, value) in map {
                            ctx.params.insert(key, value);
                        }
                    }
                    Ok(_) => {
                        return StageFlow::Stop(reply::text(
                            StatusCode::BAD_REQUEST,
                            "body must be a JSON object",
                        ));
                    }
                    Err(e) => {
                        tracing::debug!(client = %ctx.client_ip, error = %e, "malformed JSON body");
                        return StageFlow::Stop(reply::text(StatusCode::BAD_REQUEST, "malformed body"));
                    }
                }
            }
            StageFlow::Continue
        })
    }
}
