//! The HTTP host.
//!
//! A thin hyper/tokio layer over the [`Kernel`]: it turns wire requests
//! into [`Request`] values, runs them through the kernel, and writes the
//! envelope back. Application semantics never live here; transport concerns
//! (body limits, header copying, graceful shutdown) do.

use crate::config::ServerConfig;
use crate::kernel::Kernel;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use pylon_core::{PylonError, PylonResult, Request, Scheme};
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Body type for outgoing responses.
pub type ResponseBody = Full<Bytes>;

/// The Pylon HTTP server.
pub struct Server {
    kernel: Arc<Kernel>,
    config: ServerConfig,
}

impl Server {
    /// Creates a server hosting the given kernel.
    #[must_use]
    pub fn new(kernel: Kernel, config: ServerConfig) -> Self {
        Self {
            kernel: Arc::new(kernel),
            config,
        }
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The hosted kernel.
    #[must_use]
    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    /// Runs until SIGINT/SIGTERM.
    ///
    /// # Errors
    ///
    /// Binding failures.
    pub async fn run(self) -> PylonResult<()> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs until the given signal fires, then waits for in-flight
    /// connections up to the configured shutdown timeout.
    ///
    /// # Errors
    ///
    /// Binding failures.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> PylonResult<()> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            PylonError::configuration(format!("Failed to bind to {addr}: {e}"))
        })?;
        tracing::info!(%addr, "server listening");

        let tracker = ConnectionTracker::new();
        let kernel = Arc::clone(&self.kernel);
        let max_body = self.config.max_body_bytes();
        let port = addr.port();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote)) => {
                            let kernel = Arc::clone(&kernel);
                            let token = tracker.acquire();
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let kernel = Arc::clone(&kernel);
                                    async move {
                                        Ok::<_, Infallible>(
                                            handle_http(&kernel, req, max_body, port).await,
                                        )
                                    }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    tracing::debug!(%remote, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => tracing::error!(error = %e, "accept failed"),
                    }
                }
                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }

        tokio::select! {
            () = tracker.wait_idle() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(self.config.shutdown_timeout()) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "shutdown timeout reached with connections still open"
                );
            }
        }
        Ok(())
    }
}

/// Converts a wire request, runs the kernel, writes the envelope back.
///
/// Every application outcome is HTTP 200; only transport failures (a body
/// over the limit or unreadable) get their own status.
async fn handle_http(
    kernel: &Kernel,
    req: http::Request<Incoming>,
    max_body: usize,
    port: u16,
) -> http::Response<ResponseBody> {
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, max_body).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            return plain_response(
                http::StatusCode::PAYLOAD_TOO_LARGE,
                r#"{"returnCode":413,"returnMessage":"Request body too large","returnData":null,"extraData":null}"#,
            );
        }
    };

    // A body that is not a JSON object dispatches as an empty one; the
    // dispatcher then reports the missing service key.
    let data: Value = serde_json::from_slice(&body)
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

    let scheme = parts
        .headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(Scheme::Http);

    let mut request = Request::new(parts.method, parts.uri.path())
        .with_scheme(scheme)
        .with_headers(parts.headers)
        .with_query(parse_query(parts.uri.query()))
        .with_data(data)
        .with_port(port);

    let response = kernel.handle(&mut request);

    let mut http_response = http::Response::builder()
        .status(http::StatusCode::OK)
        .header(CONTENT_TYPE, "application/json");
    if let Some(headers) = http_response.headers_mut() {
        headers.extend(request.response_headers().clone());
    }
    http_response
        .body(Full::new(Bytes::from(response.to_json())))
        .unwrap_or_else(|_| {
            plain_response(http::StatusCode::INTERNAL_SERVER_ERROR, "{}")
        })
}

fn plain_response(status: http::StatusCode, body: &str) -> http::Response<ResponseBody> {
    let mut response = http::Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
    response
}

fn parse_query(raw: Option<&str>) -> HashMap<String, String> {
    raw.map(|query| {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect()
    })
    .unwrap_or_default()
}
