//! Per-request state threaded through the stage chain.
//!
//! One `RequestContext` is created per inbound request, owned exclusively by
//! that request's chain traversal, and dropped when the response has been
//! handed to the transport. Stages read and mutate it in registration order.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use crate::files::ResolvedResource;
use crate::security::ThrottlePermit;
use crate::sessions::SessionIdentity;

/// Content encoding negotiated for the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    #[default]
    Identity,
    Gzip,
}

impl ContentEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
        }
    }
}

/// Mutable request state owned by one chain traversal.
#[derive(Debug)]
pub struct RequestContext {
    /// Peer address of the accepted connection.
    pub remote_addr: SocketAddr,
    /// Client address after honoring trusted proxy hops.
    pub client_ip: IpAddr,
    pub method: Method,
    /// Path as received, percent-encoded.
    pub raw_path: String,
    /// Decoded path; the roots stage rewrites this to the internal form.
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    /// Collected request body. Bounded by the listener body limit.
    pub body: Bytes,
    /// Decoded query/body parameters. Hooks may rewrite these.
    pub params: Map<String, Value>,
    /// Who is asking, when a valid session cookie was presented.
    pub session: Option<SessionIdentity>,
    /// Virtual-root mapping result, when a root matched.
    pub resolved: Option<ResolvedResource>,
    pub encoding: ContentEncoding,
    pub is_head: bool,
    /// Admission slot held for the rest of the request. Dropping the context
    /// releases it, so disconnect unwinding cannot leak a slot.
    pub permit: Option<ThrottlePermit>,
    pub started: Instant,
}

impl RequestContext {
    pub fn new(
        remote_addr: SocketAddr,
        method: Method,
        uri: &Uri,
        headers: HeaderMap,
        body: Bytes,
        trusted_proxies: usize,
    ) -> Self {
        let raw_path = uri.path().to_string();
        let path = percent_decode_str(&raw_path).decode_utf8_lossy().into_owned();
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok());
        let client_ip = effective_client_ip(remote_addr.ip(), forwarded, trusted_proxies);

        Self {
            remote_addr,
            client_ip,
            method,
            raw_path,
            path,
            query: uri.query().map(str::to_string),
            headers,
            body,
            params: Map::new(),
            session: None,
            resolved: None,
            encoding: ContentEncoding::default(),
            is_head: false,
            permit: None,
            started: Instant::now(),
        }
    }

    /// String parameter accessor used by API handlers.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// Username of the resolved session, if any.
    pub fn username(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.username.as_str())
    }
}

/// Resolve the effective client address. With `trusted` proxy hops, the
/// rightmost `trusted` entries of `X-Forwarded-For` are proxies we trust;
/// the client is the entry just before them. With zero trusted hops the
/// header is ignored entirely.
fn effective_client_ip(remote: IpAddr, forwarded: Option<&str>, trusted: usize) -> IpAddr {
    if trusted == 0 {
        return remote;
    }
    let Some(header) = forwarded else {
        return remote;
    };
    let hops: Vec<IpAddr> =
        header.split(',').filter_map(|h| h.trim().parse().ok()).collect();
    if hops.is_empty() {
        return remote;
    }
    // The connecting peer is one trusted hop; the header covers the rest.
    let skip_from_end = trusted.saturating_sub(1);
    if skip_from_end >= hops.len() {
        return hops[0];
    }
    hops[hops.len() - 1 - skip_from_end]
}
