//! HTTP server setup and the pipeline bootstrap.
//!
//! # Responsibilities
//! - Assemble the collaborators and the stage chain in the mandated order
//! - Wire the axum transport: one catch-all handler feeding the chain
//! - Classify transport faults at the top level (benign vs unexpected)
//! - Apply hot configuration updates (trusted-proxy depth, filter rules)
//! - Serve plain TCP or TLS, with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::{ApiEnv, ApiRouter};
use crate::auth::{AuthError, FileCredentialStore, SrpParameters};
use crate::config::{RuntimeSettings, ServerConfig, SettingsCell};
use crate::files::{ContentService, RootMap};
use crate::health::{run_startup_checks, Readiness};
use crate::http::reply;
use crate::net;
use crate::observability::metrics;
use crate::pipeline::chain::ChainError;
use crate::pipeline::context::RequestContext;
use crate::pipeline::stages::{
    CompressionStage, DispatchStage, GeoStage, HeadStage, HooksStage, LogStage, ParamsStage,
    ReadinessStage, RootsStage, SecurityStage, SessionStage, ThrottleStage,
};
use crate::pipeline::StageChain;
use crate::plugins::HookRegistry;
use crate::security::{GeoRules, RuleGeoGate, TokenBucketThrottle};
use crate::sessions::SessionStore;

/// Failures while assembling the server.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("credential store: {0}")]
    Credentials(#[from] AuthError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Application state injected into the catch-all handler.
#[derive(Clone)]
pub struct AppState {
    chain: Arc<StageChain>,
    settings: Arc<SettingsCell>,
    max_body_bytes: usize,
}

/// The assembled server: collaborators, stage chain, axum router.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    chain: Arc<StageChain>,
    settings: Arc<SettingsCell>,
    geo: Arc<RuleGeoGate>,
    sessions: Arc<SessionStore>,
}

impl HttpServer {
    /// Assemble collaborators and the stage chain for a configuration.
    pub async fn new(config: ServerConfig) -> Result<Self, BootError> {
        let settings = Arc::new(SettingsCell::new(RuntimeSettings::from_config(&config)));
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(
            config.accounts.session_ttl_secs,
        )));

        let credentials = Arc::new(FileCredentialStore::open(&config.accounts.file).await?);
        let srp = SrpParameters::default();
        for account in &config.accounts.seed {
            if credentials.seed(&srp, &account.username, &account.password).await? {
                tracing::info!(user = %account.username, "seeded account");
            }
        }
        if credentials.is_empty().await {
            tracing::warn!("credential store is empty; only anonymous access will work");
        }

        let readiness = Arc::new(Readiness::new());
        run_startup_checks(&config, &readiness).await;

        let geo = Arc::new(RuleGeoGate::new(GeoRules::from_config(&config.geo)));
        let throttle = Arc::new(TokenBucketThrottle::new(config.throttle.clone()));
        let roots = Arc::new(RootMap::from_config(&config.roots));
        let hooks = Arc::new(HookRegistry::new());
        let api = Arc::new(ApiRouter::new(
            config.api.prefix.clone(),
            ApiEnv {
                sessions: sessions.clone(),
                credentials,
                srp,
                readiness: readiness.clone(),
                started: Instant::now(),
            },
        ));

        let chain = Arc::new(assemble_chain(
            sessions.clone(),
            readiness,
            geo.clone(),
            config.clone(),
            roots,
            throttle,
            hooks,
            api,
        ));

        let state = AppState {
            chain: chain.clone(),
            settings: settings.clone(),
            max_body_bytes: config.listener.max_body_bytes,
        };
        let router = Self::build_router(&config, state);

        Ok(Self { router, config, chain, settings, geo, sessions })
    }

    /// Build the axum router: every path and method lands in the chain.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(pipeline_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Stage names in invocation order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.chain.stage_names()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server on the given listener until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ServerConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.spawn_background_tasks(config_updates);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS. Certificate provisioning itself is an
    /// external concern; this consumes whatever PEM material it produced.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        config_updates: mpsc::UnboundedReceiver<ServerConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let tls = self
            .config
            .listener
            .tls
            .clone()
            .ok_or_else(|| std::io::Error::other("run_tls without TLS configuration"))?;
        let rustls_config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await?;

        tracing::info!(address = %addr, "HTTPS server starting");
        self.spawn_background_tasks(config_updates);

        let handle = axum_server::Handle::new();
        let graceful = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            graceful.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, rustls_config)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    fn spawn_background_tasks(&self, mut config_updates: mpsc::UnboundedReceiver<ServerConfig>) {
        // Apply hot-reloadable settings; requests processed after the swap
        // observe the new values.
        let settings = self.settings.clone();
        let geo = self.geo.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                settings.store(RuntimeSettings::from_config(&new_config));
                geo.replace(GeoRules::from_config(&new_config.geo));
                tracing::info!(
                    trusted_proxies = new_config.trusted_proxies,
                    "applied hot configuration update"
                );
            }
        });

        // Session sweep, jittered so a fleet does not sweep in lockstep.
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let period = Duration::from_secs(60 + fastrand::u64(0..30));
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                sessions.sweep();
            }
        });
    }
}

/// Assemble the shipped stage order.
///
/// The order is a contract, not a preference; see the stage modules for the
/// rule each position enforces. Tests assert this exact sequence.
#[allow(clippy::too_many_arguments)]
pub fn assemble_chain(
    sessions: Arc<SessionStore>,
    readiness: Arc<Readiness>,
    geo: Arc<RuleGeoGate>,
    config: ServerConfig,
    roots: Arc<RootMap>,
    throttle: Arc<TokenBucketThrottle>,
    hooks: Arc<HookRegistry>,
    api: Arc<ApiRouter>,
) -> StageChain {
    StageChain::builder()
        .stage(SessionStage::new(sessions))
        .stage(ReadinessStage::new(readiness))
        .stage(SecurityStage)
        .stage(GeoStage::new(geo))
        .stage(CompressionStage::new(config.compression.clone()))
        .stage(ParamsStage)
        .stage(HeadStage)
        .stage(RootsStage::new(roots))
        .stage(LogStage)
        .stage(ThrottleStage::new(throttle))
        .stage(HooksStage::new(hooks))
        .stage(DispatchStage::new(api, Arc::new(ContentService)))
        .build()
}

/// The catch-all handler: collect the body, build the context, run the chain.
async fn pipeline_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // A client that vanished mid-upload is routine, not an incident.
            let fault = net::classify_body_error(&e.to_string());
            net::fault::report(fault, &e, "collecting request body");
            return reply::text(StatusCode::BAD_REQUEST, "incomplete request");
        }
    };

    let trusted_proxies = state.settings.load().trusted_proxies;
    let mut ctx =
        RequestContext::new(addr, parts.method, &parts.uri, parts.headers, bytes, trusted_proxies);

    let mut response = match state.chain.run(&mut ctx).await {
        Ok(response) => response,
        Err(e @ ChainError::Unhandled { .. }) => {
            tracing::error!(error = %e, "stage chain misconfiguration");
            reply::text(StatusCode::INTERNAL_SERVER_ERROR, "server error")
        }
    };

    if ctx.is_head {
        *response.body_mut() = Body::empty();
    }
    metrics::record_response(response.status().as_u16(), ctx.started);
    response
    // ctx drops here: throttle permit released even on disconnect unwinding.
}
