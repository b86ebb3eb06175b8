mod admin;
mod cors;
mod fallback;
mod health;
mod rate_limit;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use callgate_config::Config;
use callgate_ratelimit::RequestLimiter;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// How often idle per-client rate limit keys are dropped
const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    tts: Arc<tts::Server>,
    sweep_interval: Duration,
    limiter: Option<Arc<RequestLimiter>>,
}

impl Server {
    /// Build the server from configuration
    ///
    /// Upstreams that are not configured do not fail startup; their routes
    /// answer with `MISCONFIG` instead.
    ///
    /// # Errors
    ///
    /// Returns an error if rate-limiter construction fails
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let tts_state = tts::build_server(config);
        let sippy_state = sippy::build_server(config);
        let pbx_state = pbx::build_server(config);

        // Build base router with feature routes
        let mut app = Router::new();

        // Health check
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // TTS routes
        app = app.merge(tts::endpoint_router().with_state(tts_state.clone()));

        // Sippy routes, behind the admin token when one is configured
        let mut sippy_routes = sippy::endpoint_router().with_state(sippy_state);

        if let Some(token) = config.server.admin_token() {
            let token = Arc::new(token.clone());
            sippy_routes = sippy_routes.route_layer(axum::middleware::from_fn(move |req, next| {
                let token = Arc::clone(&token);
                async move { admin::admin_token_middleware(token, req, next).await }
            }));
        } else {
            tracing::warn!("server.admin_token not set, Sippy routes are unauthenticated");
        }

        app = app.merge(sippy_routes);

        // Issabel routes
        app = app.merge(pbx::endpoint_router().with_state(pbx_state));

        app = app
            .fallback(fallback::not_found)
            .method_not_allowed_fallback(fallback::method_not_allowed);

        // Apply middleware layers (innermost first)

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        // CORS
        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        // Rate limiting
        let mut limiter = None;

        if let Some(ref rl_config) = config.server.rate_limit {
            let request_limiter = Arc::new(callgate_ratelimit::create_request_limiter(rl_config)?);
            limiter = Some(Arc::clone(&request_limiter));

            app = app.layer(axum::middleware::from_fn(move |req, next| {
                let limiter = Arc::clone(&request_limiter);
                async move { rate_limit::rate_limit_middleware_arc(limiter, req, next).await }
            }));
        }

        Ok(Self {
            router: app,
            listen_address,
            tts: tts_state,
            sweep_interval: config.elevenlabs.sweep_interval,
            limiter,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start the background tasks tied to `shutdown`
    ///
    /// Runs the TTS asset sweep and, when rate limiting is enabled, the
    /// pruning of idle client keys.
    pub fn spawn_background_tasks(&self, shutdown: &CancellationToken) {
        tts::spawn_sweeper(Arc::clone(&self.tts), self.sweep_interval, shutdown.clone());

        if let Some(limiter) = self.limiter.clone() {
            let shutdown = shutdown.clone();

            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(RATE_LIMIT_PRUNE_INTERVAL);

                loop {
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        _ = ticker.tick() => limiter.prune(),
                    }
                }
            });
        }
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        self.spawn_background_tasks(&shutdown);

        axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
