//! HTTP listener and graceful shutdown.
//!
//! The listener is the collaborator around the routing core: it accepts
//! connections, parses requests (hyper does the HTTP/1.1 and HTTP/2 work),
//! hands each one to [`dispatch`](crate::dispatch) and writes back whatever
//! [`Response`] comes out.
//!
//! # Shutdown
//!
//! On **SIGTERM** or **Ctrl-C** (or when the future passed to
//! [`Server::serve_with_shutdown`] resolves) the server:
//! 1. Immediately stops `listener.accept()`; no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from `serve`.
//!
//! # Contract violations
//!
//! A handler contract broken while serving means the application is
//! misconfigured. The offending connection is closed without a response, the
//! violation is logged, accepting stops, every other open connection is
//! aborted, and `serve` returns [`Error::Contract`] so the process fails
//! loudly instead of answering `500` forever.

use std::borrow::Cow;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::binding::BindingTable;
use crate::context::Context;
use crate::dispatcher::dispatch;
use crate::error::{ContractViolation, Error};
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
#[derive(Clone, Copy, Debug)]
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use waypost::Server;
    /// let server = Server::bind(([0, 0, 0, 0], 3000));
    /// ```
    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self { addr: addr.into() }
    }

    /// Like [`bind`](Server::bind), parsing a `host:port` string.
    pub fn bind_str(addr: &str) -> Result<Self, Error> {
        Ok(Self { addr: addr.parse()? })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Binds the listening socket without serving yet.
    ///
    /// The returned [`Listener`] reports the address actually bound, which is
    /// how callers learn the port when binding to port `0`.
    pub async fn listen(self) -> Result<Listener, Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "waypost listening");
        Ok(Listener { listener, addr })
    }

    /// Serves `table` until SIGTERM or Ctrl-C, then drains.
    pub async fn serve<D>(self, table: BindingTable<D>) -> Result<(), Error>
    where
        D: Default + Send + 'static,
    {
        self.listen().await?.serve(table).await
    }

    /// Serves `table` until `signal` resolves, then drains.
    pub async fn serve_with_shutdown<D, S>(self, table: BindingTable<D>, signal: S) -> Result<(), Error>
    where
        D: Default + Send + 'static,
        S: Future<Output = ()>,
    {
        self.listen().await?.serve_with_shutdown(table, signal).await
    }
}

/// A bound socket, obtained from [`Server::listen`].
#[derive(Debug)]
pub struct Listener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl Listener {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves `table` until SIGTERM or Ctrl-C, then drains.
    pub async fn serve<D>(self, table: BindingTable<D>) -> Result<(), Error>
    where
        D: Default + Send + 'static,
    {
        self.serve_with_shutdown(table, shutdown_signal()).await
    }

    /// Serves `table` until `signal` resolves, then drains.
    ///
    /// A contract violation ends serving too. Open connections are then
    /// aborted rather than drained: an idle keep-alive client must not be
    /// able to hold the failing server open.
    pub async fn serve_with_shutdown<D, S>(self, table: BindingTable<D>, signal: S) -> Result<(), Error>
    where
        D: Default + Send + 'static,
        S: Future<Output = ()>,
    {
        let Self { listener, addr } = self;
        let table = Arc::new(table);

        // Connection tasks report contract violations here; the first one
        // stops the accept loop.
        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel::<ContractViolation>();
        let mut fatal = None;

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                Some(violation) = fatal_rx.recv() => {
                    error!(in_flight = tasks.len(), error = %violation, "contract violation, shutting down");
                    tasks.abort_all();
                    fatal = Some(violation);
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let table = Arc::clone(&table);
                    let fatal_tx = fatal_tx.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let table = Arc::clone(&table);
                            let fatal_tx = fatal_tx.clone();
                            async move {
                                let result = handle(&table, req).await;
                                if let Err(Error::Contract(violation)) = &result {
                                    // The receiver only goes away once serve is returning.
                                    let _ = fatal_tx.send(violation.clone());
                                }
                                result
                            }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        // A violation may have raced the shutdown signal.
        if fatal.is_none() {
            fatal = fatal_rx.try_recv().ok();
        }

        info!(%addr, "waypost stopped");
        match fatal {
            Some(violation) => Err(Error::Contract(violation)),
            None => Ok(()),
        }
    }
}

// ── Request handling ──────────────────────────────────────────────────────────

/// Converts one hyper request, dispatches it, converts the response back.
///
/// An `Err` makes hyper close the connection without writing a response.
async fn handle<D>(
    table: &BindingTable<D>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Error>
where
    D: Default,
{
    let req = into_request(req).await?;
    let mut cx = Context::default();
    let response: Response = dispatch(table, req, &mut cx).await?;
    Ok(response.into_http())
}

async fn into_request(req: hyper::Request<hyper::body::Incoming>) -> Result<Request, Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();

    let mut request = Request::new(parts.method.as_str(), parts.uri.path()).with_body(body);
    for (name, value) in &parts.headers {
        request = request.with_header(name.as_str(), header_value(name, value));
    }
    Ok(request)
}

/// Opaque header bytes are kept lossily so a check on the header still sees it.
fn header_value<'v>(name: &HeaderName, value: &'v HeaderValue) -> Cow<'v, str> {
    match value.to_str() {
        Ok(value) => Cow::Borrowed(value),
        Err(_) => {
            warn!(header = %name, "request header is not visible ASCII, decoding lossily");
            String::from_utf8_lossy(value.as_bytes())
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. If a handler cannot be installed the
/// corresponding arm never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::handler::BoxFuture;
    use crate::router::Router;

    fn ok<'a>(_req: Request, _cx: &'a mut Context) -> BoxFuture<'a, StatusCode> {
        Box::pin(async { StatusCode::OK })
    }

    fn silent<'a>(_req: &'a Request, _cx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    #[test]
    fn bind_str_parses_or_fails() {
        let server = Server::bind_str("127.0.0.1:8080").unwrap();
        assert_eq!(server.addr(), SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert!(matches!(Server::bind_str("not an address"), Err(Error::Addr(_))));
    }

    #[tokio::test]
    async fn listen_reports_the_bound_port() {
        let listener = Server::bind(([127, 0, 0, 1], 0)).listen().await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[test]
    fn opaque_header_values_are_kept() {
        let name = HeaderName::from_static("x-token");
        let value = HeaderValue::from_bytes(b"caf\xe9").unwrap();
        assert_eq!(header_value(&name, &value), "caf\u{fffd}");

        let value = HeaderValue::from_static("plain");
        assert!(matches!(header_value(&name, &value), Cow::Borrowed("plain")));
    }

    #[tokio::test]
    async fn contract_violation_stops_serve_despite_idle_connections() {
        let table = Router::new()
            .get("/ok", ok)
            .middleware("/bad", silent)
            .get("/bad", ok)
            .build()
            .unwrap();

        let listener = Server::bind(([127, 0, 0, 1], 0)).listen().await.unwrap();
        let addr = listener.local_addr();
        let serving = tokio::spawn(listener.serve_with_shutdown(table, std::future::pending()));

        // A keep-alive client that is answered once and then stays connected.
        let mut idle = TcpStream::connect(addr).await.unwrap();
        idle.write_all(b"GET /ok HTTP/1.1\r\nhost: localhost\r\n\r\n").await.unwrap();
        let mut buf = [0u8; 512];
        let n = idle.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"HTTP/1.1 200"));

        let mut bad = TcpStream::connect(addr).await.unwrap();
        bad.write_all(b"GET /bad HTTP/1.1\r\nhost: localhost\r\n\r\n").await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("serve must return after a contract violation")
            .unwrap();
        assert!(matches!(
            result,
            Err(Error::Contract(ContractViolation::NoOutcome { position: 0, .. }))
        ));

        // The violating request was never answered.
        let mut rest = Vec::new();
        let _ = tokio::time::timeout(Duration::from_secs(1), bad.read_to_end(&mut rest)).await;
        assert!(!rest.starts_with(b"HTTP/1.1 200"));
        drop(idle);
    }
}
