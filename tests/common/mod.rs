//! Shared utilities for integration tests: boot a real server on a loopback
//! port with a temporary share root and credential store.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use filedock::config::schema::{RootConfig, SeedAccount};
use filedock::config::ServerConfig;
use filedock::{HttpServer, Shutdown};

#[allow(dead_code)] // each integration-test binary uses a different subset
pub struct TestServer {
    pub addr: SocketAddr,
    pub base: String,
    pub api: String,
    pub share_dir: PathBuf,
    pub config_tx: mpsc::UnboundedSender<ServerConfig>,
    pub config: ServerConfig,
    shutdown: Shutdown,
}

impl TestServer {
    /// Boot a server seeded with `alice`/`oldpw` and one shared file,
    /// applying `mutate` to the configuration first.
    pub async fn spawn(mutate: impl FnOnce(&mut ServerConfig)) -> Self {
        let dir = std::env::temp_dir().join(format!("filedock-it-{}", uuid::Uuid::new_v4()));
        let share_dir = dir.join("share");
        std::fs::create_dir_all(&share_dir).unwrap();
        std::fs::write(share_dir.join("hello.txt"), b"hello world").unwrap();

        let mut config = ServerConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.roots.push(RootConfig { prefix: "/".into(), path: share_dir.clone() });
        config.accounts.file = dir.join("accounts.json");
        config.accounts.seed.push(SeedAccount { username: "alice".into(), password: "oldpw".into() });
        mutate(&mut config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let (config_tx, config_rx) = mpsc::unbounded_channel();
        let server = HttpServer::new(config.clone()).await.unwrap();
        let server_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, config_rx, server_shutdown).await;
        });

        let base = format!("http://{addr}");
        let api = format!("{base}{}", config.api.prefix);
        let this = Self { addr, base, api, share_dir, config_tx, config, shutdown };
        this.wait_until_serving().await;
        this
    }

    async fn wait_until_serving(&self) {
        let client = client();
        for _ in 0..50 {
            if client.get(format!("{}/get_status", self.api)).send().await.is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
        panic!("server did not come up on {}", self.addr);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// A client with its own cookie jar and no connection reuse surprises.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
