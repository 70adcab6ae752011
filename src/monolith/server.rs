//! HTTP accept loop with per-connection timeouts and a bounded drain

use super::middleware::AppService;
use super::{MonolithError, Result};
use axum::body::Body;
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, ready};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::{Instant, Sleep, sleep};
use tower::{Service, ServiceExt};
use tracing::Span;

/// Connection timeouts and drain window
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    /// Time allowed to receive a request's headers
    pub read_timeout: Duration,
    /// Time a single write may stall before the connection is dropped
    pub write_timeout: Duration,
    /// Time a connection may sit between requests without any I/O
    pub idle_timeout: Duration,
    /// Time in-flight connections get to finish after shutdown starts
    pub drain_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// Accept connections until `shutdown` resolves, then drain.
///
/// Returns `Ok(())` when every connection closed within the drain window,
/// [`MonolithError::DrainTimeout`] otherwise. Accept failures other than
/// per-connection ones end the loop with [`MonolithError::Listener`].
pub(crate) async fn run<F>(
    listener: TcpListener,
    service: AppService,
    options: ServeOptions,
    shutdown: F,
    logger: &Span,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    // Dropping `signal_tx` tells every connection to finish gracefully.
    let (signal_tx, signal_rx) = watch::channel(());
    // Each connection holds a `close_rx`; `closed()` resolves once all are gone.
    let (close_tx, close_rx) = watch::channel(());
    tokio::pin!(shutdown);

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(err) if is_connection_error(&err) => {
                    tracing::debug!(parent: logger, error = %err, "failed to accept connection");
                    continue;
                }
                Err(err) => return Err(MonolithError::Listener(err)),
            },
            _ = &mut shutdown => break,
        };

        let in_flight = InFlight::default();
        let io = TokioIo::new(DeadlineIo::new(
            stream,
            options.idle_timeout,
            options.write_timeout,
            in_flight.clone(),
        ));
        let hyper_service = TowerToHyperService::new(TrackInFlight {
            inner: service
                .clone()
                .map_request(|request: Request<Incoming>| request.map(Body::new)),
            in_flight,
        });
        let mut signal_rx = signal_rx.clone();
        let close_rx = close_rx.clone();
        let logger = logger.clone();

        tokio::spawn(async move {
            let mut builder = auto::Builder::new(TokioExecutor::new());
            builder
                .http1()
                .timer(TokioTimer::new())
                .header_read_timeout(options.read_timeout);

            let conn = builder.serve_connection(io, hyper_service);
            tokio::pin!(conn);

            let mut draining = false;
            loop {
                tokio::select! {
                    result = conn.as_mut() => {
                        if let Err(err) = result {
                            tracing::debug!(parent: &logger, remote = %remote, error = %err, "connection ended with error");
                        }
                        break;
                    }
                    _ = signal_rx.changed(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            }

            drop(close_rx);
        });
    }

    drop(listener);
    drop(close_rx);
    drop(signal_tx);

    tracing::info!(
        parent: logger,
        connections = close_tx.receiver_count(),
        "waiting for in-flight connections to finish"
    );

    match tokio::time::timeout(options.drain_timeout, close_tx.closed()).await {
        Ok(()) => Ok(()),
        Err(_) => Err(MonolithError::DrainTimeout(options.drain_timeout)),
    }
}

// Errors that concern one connection, not the listener.
fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Number of requests a connection is currently handling
#[derive(Clone, Default)]
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(&self) -> InFlightGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.0.clone())
    }

    fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Marks the connection busy from the moment a request reaches the service
/// until its response future finishes or is dropped.
#[derive(Clone)]
struct TrackInFlight<S> {
    inner: S,
    in_flight: InFlight,
}

impl<S, R> Service<R> for TrackInFlight<S>
where
    S: Service<R>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, std::result::Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: R) -> Self::Future {
        let guard = self.in_flight.enter();
        let response = self.inner.call(request);
        Box::pin(async move {
            let response = response.await;
            drop(guard);
            response
        })
    }
}

/// Stream wrapper enforcing the idle and write timeouts.
///
/// The idle clock runs only while no request is in flight, and restarts on
/// every successful read or write. A write that stays pending past the write
/// timeout fails the connection.
struct DeadlineIo<T> {
    inner: T,
    idle_timeout: Duration,
    write_timeout: Duration,
    idle_deadline: Pin<Box<Sleep>>,
    write_deadline: Option<Pin<Box<Sleep>>>,
    in_flight: InFlight,
}

impl<T> DeadlineIo<T> {
    fn new(inner: T, idle_timeout: Duration, write_timeout: Duration, in_flight: InFlight) -> Self {
        Self {
            inner,
            idle_timeout,
            write_timeout,
            idle_deadline: Box::pin(sleep(idle_timeout)),
            write_deadline: None,
            in_flight,
        }
    }

    fn touch(&mut self) {
        let next = Instant::now() + self.idle_timeout;
        self.idle_deadline.as_mut().reset(next);
    }

    fn guard_write<R>(&mut self, cx: &mut Context<'_>, poll: Poll<io::Result<R>>) -> Poll<io::Result<R>> {
        match poll {
            Poll::Ready(result) => {
                self.write_deadline = None;
                self.touch();
                Poll::Ready(result)
            }
            Poll::Pending => {
                let timeout = self.write_timeout;
                let deadline = self
                    .write_deadline
                    .get_or_insert_with(|| Box::pin(sleep(timeout)));
                ready!(deadline.as_mut().poll(cx));
                Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "write timed out",
                )))
            }
        }
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for DeadlineIo<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.touch();
                Poll::Ready(result)
            }
            Poll::Pending if this.in_flight.is_busy() => {
                // hyper keeps reading while a handler runs
                this.touch();
                Poll::Pending
            }
            Poll::Pending => {
                ready!(this.idle_deadline.as_mut().poll(cx));
                Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "connection idle for too long",
                )))
            }
        }
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for DeadlineIo<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_write(cx, buf);
        this.guard_write(cx, poll)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_write_vectored(cx, bufs);
        this.guard_write(cx, poll)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_flush(cx);
        this.guard_write(cx, poll)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
