//! HTTP server: routing, connection loop, shutdown.

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::adapter::Adapter;
use crate::cache::ClientCache;
use crate::config::GatewayConfig;
use crate::dump::{FileDump, RequestDump};
use crate::handlers::{self, full};

/// State shared by every connection task.
pub struct AppState {
    pub adapter: Adapter,
    pub dump: Arc<dyn RequestDump + Send + Sync>,
}

pub async fn start_server(config: GatewayConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        adapter: Adapter::new(ClientCache::new(config.gemini_base_url.clone())),
        dump: Arc::new(FileDump::new(config.dump_dir.clone())),
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}, press ctrl+c to stop");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let stream = match accepted {
                    Ok((stream, _)) => stream,
                    Err(err) => {
                        warn!(%err, "accept failed");
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let service =
                        service_fn(move |request| route(request, Arc::clone(&state)));
                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        debug!(%err, "connection closed with error");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    state.adapter.teardown();
    Ok(())
}

async fn route(
    request: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, hyper::Error> {
    match (request.method(), request.uri().path()) {
        (&Method::POST, "/chat/completions") => {
            let (parts, body) = request.into_parts();
            let bytes = body.collect().await?.to_bytes();
            Ok(handlers::chat_completions::chat_completions(&parts.headers, bytes, state).await)
        }
        (&Method::GET, "/health") => Ok(Response::new(full("OK"))),
        _ => {
            error!(path = %request.uri(), "not found");
            let mut response = Response::new(full("404 - Not Found"));
            *response.status_mut() = StatusCode::NOT_FOUND;
            Ok(response)
        }
    }
}
