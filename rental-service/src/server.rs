//! HTTP server with graceful shutdown

use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::{Config, CorsMode},
    error::Result,
    middleware::{
        request_id_header, request_id_layer, request_id_propagation_layer, sensitive_headers_layer,
    },
};

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Wrap `app` in the middleware stack configured under `[middleware]`
    pub fn layered(&self, app: Router) -> Result<Router> {
        let body_limit = self.config.middleware.body_limit_mb * 1024 * 1024;
        let request_id = request_id_header(&self.config.middleware.request_id_header)?;

        // Last layer added runs first
        Ok(app
            .layer(self.build_cors_layer())
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::with_status_code(
                http::StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(self.config.service.timeout_secs),
            ))
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(sensitive_headers_layer())
            .layer(request_id_propagation_layer(request_id.clone()))
            .layer(request_id_layer(request_id))
            .layer(CatchPanicLayer::new()))
    }

    /// Serve `app` until SIGINT/SIGTERM or until `shutdown` is cancelled
    ///
    /// A received signal cancels `shutdown`, which aborts in-flight listing
    /// queries holding a child token.
    pub async fn serve(self, app: Router, shutdown: CancellationToken) -> Result<()> {
        let app = self.layered(app)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));
        let listener = TcpListener::bind(addr).await?;

        let middleware = &self.config.middleware;
        tracing::info!(
            service = %self.config.service.name,
            %addr,
            cors_mode = %middleware.cors_mode,
            request_id_header = %middleware.request_id_header,
            body_limit_mb = middleware.body_limit_mb,
            timeout_secs = self.config.service.timeout_secs,
            "Listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn build_cors_layer(&self) -> CorsLayer {
        match self.config.middleware.cors_mode {
            CorsMode::Permissive => CorsLayer::permissive(),
            CorsMode::Restrictive => CorsLayer::new(),
        }
    }
}

/// Resolve on SIGINT, SIGTERM or external cancellation; always leaves `shutdown` cancelled
async fn shutdown_signal(shutdown: CancellationToken) {
    let reason = tokio::select! {
        () = interrupt() => "SIGINT",
        () = terminate() => "SIGTERM",
        () = shutdown.cancelled() => "cancelled",
    };

    tracing::info!(reason, "Draining connections and cancelling in-flight queries");
    shutdown.cancel();
}

async fn interrupt() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for SIGINT");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}
