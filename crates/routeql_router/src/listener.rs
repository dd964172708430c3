//! HTTP/1 serving on hyper.
//!
//! Each accepted connection is served on its own task. Requests are converted
//! into [`RouteRequest`]s and answered through [`Router::dispatch`].

use crate::error::{RouteError, RouterError};
use crate::request::{parse_query, ResponseBody, RouteRequest, RouteResponse};
use crate::router::Router;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

fn full<T: Into<Bytes>>(chunk: T) -> BoxBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
        }
    }
}

impl ServeConfig {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn addr(&self) -> Result<SocketAddr, RouterError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| RouterError::InvalidAddress(format!("{}:{} ({e})", self.host, self.port)))
    }
}

/// Binds the listener and serves until an accept error occurs.
pub async fn serve(router: Arc<Router>, config: &ServeConfig) -> Result<(), RouterError> {
    let addr = config.addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| RouterError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!("Listening on http://{}", addr);
    serve_listener(router, listener).await
}

/// Serves connections from an already bound listener.
pub async fn serve_listener(router: Arc<Router>, listener: TcpListener) -> Result<(), RouterError> {
    loop {
        let (stream, peer) = listener.accept().await.map_err(RouterError::Accept)?;
        let io = TokioIo::new(stream);
        let router = Arc::clone(&router);

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let router = Arc::clone(&router);
                async move { Ok::<_, Infallible>(handle(&router, req).await) }
            });
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                if !err.is_incomplete_message() {
                    error!(%peer, "Connection error: {:?}", err);
                }
            }
        });
    }
}

async fn handle(router: &Arc<Router>, req: Request<Incoming>) -> Response<BoxBody> {
    let (parts, body) = req.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            debug!("Failed to read body: {}", err);
            return into_hyper(RouteError::bad_request("Failed to read request body").into());
        }
    };
    let request = match into_route_request(&parts, &bytes) {
        Ok(request) => request,
        Err(err) => return into_hyper(err.into()),
    };
    into_hyper(router.dispatch(request).await)
}

fn into_route_request(parts: &http::request::Parts, body: &[u8]) -> Result<RouteRequest, RouteError> {
    let mut request = RouteRequest::new(parts.method.clone(), parts.uri.path());
    if let Some(query) = parts.uri.query() {
        request.query = parse_query(query);
    }
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            request.headers.insert(name.as_str().to_string(), value.to_string());
        }
    }
    if !body.iter().all(u8::is_ascii_whitespace) {
        let payload = serde_json::from_slice(body)
            .map_err(|_| RouteError::bad_request("Invalid request payload JSON format"))?;
        request.payload = Some(payload);
    }
    Ok(request)
}

fn into_hyper(response: RouteResponse) -> Response<BoxBody> {
    let mut builder = Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let body = match response.body {
        ResponseBody::Empty => full(Bytes::new()),
        ResponseBody::Json(value) => full(value.to_string()),
        ResponseBody::Html(html) => full(html),
    };
    builder.body(body).unwrap_or_else(|err| {
        error!("Invalid response: {}", err);
        let mut fallback = Response::new(full(Bytes::new()));
        *fallback.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
