//! Serving pooled-context handlers from a standard `http`/hyper server.

use crate::{
    adaptor::convert::{copy_request, read_body, resolve_remote_addr, to_http_response},
    errors::{BoxError, ErrorKind},
    limits::{PoolLimits, ReqLimits, RespLimits},
    App, ConnectionData, CtxPool, Handler, RemoteAddr, RequestHandler,
};
use bytes::Bytes;
use http_body::Body;
use http_body_util::Full;
use std::{convert::Infallible, fmt, future::Future, pin::Pin, sync::Arc};
use tracing::warn;

/// A hyper [`Service`](hyper::service::Service) running a [`RequestHandler`]
/// on pooled contexts.
///
/// Each call reads the whole request body, fills a pooled context, resolves
/// the peer address, invokes the handler once and copies its response into a
/// `http::Response`. Any failure along the way is answered with a fixed
/// `500 Internal Server Error` and the handler is not invoked.
///
/// Created by [`fast_handler`], [`fast_app`] and [`ctx_handler`]. Cloning is
/// cheap, so one service can be handed to every connection.
pub struct FastService<R, S = ()>
where
    R: RequestHandler<S>,
    S: ConnectionData,
{
    handler: Arc<R>,
    pool: CtxPool<S>,
    remote_addr: Option<RemoteAddr>,
}

impl<R, S> FastService<R, S>
where
    R: RequestHandler<S>,
    S: ConnectionData,
{
    /// Wraps a handler with its own context pool.
    #[inline]
    pub fn new(handler: R, pool: CtxPool<S>) -> Self {
        Self {
            handler: Arc::new(handler),
            pool,
            remote_addr: None,
        }
    }

    /// Returns a copy of the service that uses `addr` for requests without a
    /// [`RemoteAddr`] extension.
    ///
    /// # Examples
    /// ```no_run
    /// # maker_adaptor::impt_default_handler!{ MyHandler }
    /// use hyper::server::conn::http1;
    /// use hyper_util::rt::TokioIo;
    /// use tokio::net::TcpListener;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let service = maker_adaptor::fast_handler(MyHandler);
    /// let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
    ///
    /// loop {
    ///     let (stream, peer) = listener.accept().await.unwrap();
    ///     let service = service.with_remote_addr(peer);
    ///
    ///     tokio::spawn(async move {
    ///         let _ = http1::Builder::new()
    ///             .serve_connection(TokioIo::new(stream), service)
    ///             .await;
    ///     });
    /// }
    /// # }
    /// ```
    #[inline]
    pub fn with_remote_addr<A: Into<RemoteAddr>>(&self, addr: A) -> Self {
        Self {
            handler: self.handler.clone(),
            pool: self.pool.clone(),
            remote_addr: Some(addr.into()),
        }
    }

    #[inline(always)]
    pub fn pool(&self) -> &CtxPool<S> {
        &self.pool
    }

    /// Translates one request and runs the handler on it.
    pub async fn serve<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        match self.translate(req).await {
            Ok(resp) => resp,
            Err(err) => {
                warn!(error = %err, "request translation failed, answering 500");
                err.into_http()
            }
        }
    }

    async fn translate<B>(&self, req: http::Request<B>) -> Result<http::Response<Full<Bytes>>, ErrorKind>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let body = read_body(body, self.pool.request_limits()).await?;

        let mut ctx = self.pool.acquire();
        copy_request(&parts, &body, &mut ctx.request);

        let addr = parts
            .extensions
            .get::<RemoteAddr>()
            .or(self.remote_addr.as_ref())
            .map_or("", RemoteAddr::as_str);
        ctx.request.client_addr = resolve_remote_addr(addr).await?;

        self.handler.call(&mut *ctx).await;

        to_http_response(&ctx.response)
    }
}

impl<R, S> Clone for FastService<R, S>
where
    R: RequestHandler<S>,
    S: ConnectionData,
{
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            pool: self.pool.clone(),
            remote_addr: self.remote_addr.clone(),
        }
    }
}

impl<R, S> fmt::Debug for FastService<R, S>
where
    R: RequestHandler<S>,
    S: ConnectionData,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastService")
            .field("pool", &self.pool)
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

impl<R, S, B> hyper::service::Service<http::Request<B>> for FastService<R, S>
where
    R: RequestHandler<S>,
    S: ConnectionData,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.serve(req).await) })
    }
}

/// Wraps a fast-model [`Handler`] for use inside a standard server.
///
/// The handler runs in an [`App`] with default limits; use [`fast_app`] to
/// choose them.
///
/// # Examples
/// ```
/// use http_body_util::{BodyExt, Full};
/// use maker_adaptor::{Handled, Handler, RemoteAddr, Request, Response, StatusCode};
///
/// struct Hello;
///
/// impl Handler for Hello {
///     async fn handle(&self, _: &mut (), req: &Request, resp: &mut Response) -> Handled {
///         resp.status(StatusCode::Ok).body_with(|w| {
///             w.write("hello ");
///             w.write(req.client_addr().to_string());
///         })
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let service = maker_adaptor::fast_handler(Hello);
///
/// let mut req = http::Request::new(Full::<bytes::Bytes>::default());
/// req.extensions_mut().insert(RemoteAddr::from("127.0.0.1:4000"));
///
/// let resp = service.serve(req).await;
/// let body = resp.into_body().collect().await.unwrap().to_bytes();
/// assert_eq!(body, "hello 127.0.0.1:4000");
/// # }
/// ```
pub fn fast_handler<H, S>(handler: H) -> FastService<App<H, S>, S>
where
    H: Handler<S>,
    S: ConnectionData,
{
    fast_app(App::new(handler))
}

/// Serves a whole fast-model [`App`], with its limits and pool, from a
/// standard server.
pub fn fast_app<H, S>(app: App<H, S>) -> FastService<App<H, S>, S>
where
    H: Handler<S>,
    S: ConnectionData,
{
    let pool = app.pool().clone();
    FastService::new(app, pool)
}

/// Wraps a low-level [`RequestHandler`] for use inside a standard server,
/// with a context pool built from default limits.
pub fn ctx_handler<R, S>(handler: R) -> FastService<R, S>
where
    R: RequestHandler<S>,
    S: ConnectionData,
{
    FastService::new(
        handler,
        CtxPool::new(
            PoolLimits::default(),
            ReqLimits::default(),
            RespLimits::default(),
        ),
    )
}
