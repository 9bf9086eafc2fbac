//! Virtual roots and static content delivery.
//!
//! A virtual root maps an externally visible URL prefix to a directory.
//! Resolution picks the longest matching prefix and yields the internal
//! filesystem path; delivery streams the file, serving `index.html` for
//! directories and honoring HEAD semantics decided earlier in the chain.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use crate::config::schema::RootConfig;
use crate::http::reply;
use crate::pipeline::context::RequestContext;

/// Result of virtual-root resolution, carried in the request context so
/// logging and throttling observe the authoritative resource identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    /// The prefix that matched.
    pub root_prefix: String,
    /// Internal path of the resource.
    pub fs_path: PathBuf,
}

#[derive(Debug)]
struct Root {
    prefix: String,
    dir: PathBuf,
}

/// Configured prefix → directory mappings, longest prefix wins.
#[derive(Debug, Default)]
pub struct RootMap {
    roots: Vec<Root>,
}

impl RootMap {
    pub fn from_config(configured: &[RootConfig]) -> Self {
        let mut roots: Vec<Root> = configured
            .iter()
            .map(|r| Root { prefix: r.prefix.trim_end_matches('/').to_string(), dir: r.path.clone() })
            .collect();
        roots.sort_by_key(|r| std::cmp::Reverse(r.prefix.len()));
        Self { roots }
    }

    /// Map a decoded request path to an internal resource.
    pub fn resolve(&self, path: &str) -> Option<ResolvedResource> {
        for root in &self.roots {
            let remainder = if root.prefix.is_empty() {
                path
            } else {
                match path.strip_prefix(&root.prefix) {
                    Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                    _ => continue,
                }
            };
            // The security stage rejected traversal; refuse it again at the
            // join point since this is the last line before the filesystem.
            if remainder.split('/').any(|segment| segment == "..") {
                return None;
            }
            let mut fs_path = root.dir.clone();
            let relative = remainder.trim_start_matches('/');
            if !relative.is_empty() {
                fs_path.push(relative);
            }
            return Some(ResolvedResource {
                root_prefix: if root.prefix.is_empty() { "/".to_string() } else { root.prefix.clone() },
                fs_path,
            });
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Serves resolved resources as HTTP responses.
pub struct ContentService;

impl ContentService {
    /// Deliver the context's resolved resource, or 404.
    pub async fn serve(&self, ctx: &RequestContext) -> Response {
        let Some(resolved) = &ctx.resolved else {
            return reply::not_found();
        };

        let mut fs_path = resolved.fs_path.clone();
        let mut meta = match tokio::fs::metadata(&fs_path).await {
            Ok(meta) => meta,
            Err(_) => return reply::not_found(),
        };
        if meta.is_dir() {
            fs_path.push("index.html");
            meta = match tokio::fs::metadata(&fs_path).await {
                Ok(meta) => meta,
                Err(_) => return reply::not_found(),
            };
        }

        let file = match tokio::fs::File::open(&fs_path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %fs_path.display(), error = %e, "failed to open resolved file");
                return reply::not_found();
            }
        };

        let builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type(&fs_path))
            .header(header::CONTENT_LENGTH, meta.len());

        // HEAD gets the same head, no body.
        let body = if ctx.is_head {
            Body::empty()
        } else {
            Body::from_stream(ReaderStream::new(file))
        };
        builder.body(body).expect("static response head is valid")
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("txt") | Some("md") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> RootMap {
        let configured: Vec<RootConfig> = entries
            .iter()
            .map(|(prefix, path)| RootConfig { prefix: prefix.to_string(), path: path.into() })
            .collect();
        RootMap::from_config(&configured)
    }

    #[test]
    fn longest_prefix_wins() {
        let roots = map(&[("/", "/srv/default"), ("/photos", "/srv/photos")]);

        let hit = roots.resolve("/photos/cat.jpg").unwrap();
        assert_eq!(hit.root_prefix, "/photos");
        assert_eq!(hit.fs_path, PathBuf::from("/srv/photos/cat.jpg"));

        let fallback = roots.resolve("/other/file.txt").unwrap();
        assert_eq!(fallback.root_prefix, "/");
        assert_eq!(fallback.fs_path, PathBuf::from("/srv/default/other/file.txt"));
    }

    #[test]
    fn prefix_must_match_on_segment_boundary() {
        let roots = map(&[("/photos", "/srv/photos")]);
        assert!(roots.resolve("/photosx/cat.jpg").is_none());
        assert!(roots.resolve("/photos").is_some());
    }

    #[test]
    fn no_roots_resolves_nothing() {
        let roots = RootMap::default();
        assert!(roots.resolve("/anything").is_none());
    }

    #[test]
    fn traversal_is_refused_at_the_join_point() {
        let roots = map(&[("/", "/srv/share")]);
        assert!(roots.resolve("/../etc/passwd").is_none());
    }

    #[test]
    fn content_types_cover_common_extensions() {
        assert_eq!(content_type(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("a.bin")), "application/octet-stream");
        assert_eq!(content_type(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn serves_a_real_file_and_honors_head() {
        let dir = std::env::temp_dir().join(format!("filedock-files-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("hello.txt"), b"hello world").unwrap();

        let roots = map(&[("/", dir.to_str().unwrap())]);
        let service = ContentService;

        let mut ctx = RequestContext::new(
            "127.0.0.1:1".parse().unwrap(),
            axum::http::Method::GET,
            &"/hello.txt".parse().unwrap(),
            axum::http::HeaderMap::new(),
            axum::body::Bytes::new(),
            0,
        );
        ctx.resolved = roots.resolve("/hello.txt");

        let response = service.serve(&ctx).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "11");

        ctx.is_head = true;
        let head = service.serve(&ctx).await;
        assert_eq!(head.headers()[header::CONTENT_LENGTH], "11");
        let body = axum::body::to_bytes(head.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }
}
