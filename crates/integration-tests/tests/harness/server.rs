//! In-process callgate instance for end-to-end tests

use std::{net::SocketAddr, time::Duration};

use callgate_config::Config;
use callgate_server::Server;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Upper bound on any single request a test makes against the gateway
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Gateway serving on an ephemeral loopback port until dropped
pub struct TestServer {
    base_url: String,
    http: reqwest::Client,
    shutdown: CancellationToken,
    serving: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let gateway = Server::new(&config)?;
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let shutdown = CancellationToken::new();
        gateway.spawn_background_tasks(&shutdown);

        let app = gateway
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let stop = shutdown.clone().cancelled_owned();

        let serving = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).with_graceful_shutdown(stop).await {
                eprintln!("test gateway stopped: {error}");
            }
        });

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            base_url,
            http,
            shutdown,
            serving,
        })
    }

    /// Absolute URL for a gateway path such as `/health`
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.serving.abort();
    }
}
