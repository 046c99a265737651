//! Running standard `http` services inside the pooled model.

use crate::{
    adaptor::convert::{copy_response, to_http_request},
    errors::{BoxError, ErrorKind},
    ConnectionData, Handled, Handler, Request, RequestCtx, RequestHandler, Response,
};
use bytes::Bytes;
use http_body::Body;
use http_body_util::Full;
use hyper::service::Service;
use tracing::warn;

/// A standard-model service adapted to the pooled model.
///
/// Implements both [`Handler`] and [`RequestHandler`]: the pooled request is
/// turned into an `http::Request<Full<Bytes>>` (with a
/// [`RemoteAddr`](crate::RemoteAddr) extension holding the client address),
/// the service is called and its whole response is copied back. Conversion
/// failures, service errors and response body errors all end in a fixed
/// `500 Internal Server Error`.
///
/// # Examples
/// ```
/// use http_body_util::Full;
/// use hyper::service::service_fn;
/// use maker_adaptor::{App, RequestHandler};
/// use std::convert::Infallible;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let service = service_fn(|req: http::Request<Full<bytes::Bytes>>| async move {
///     let body = format!("{} {}", req.method(), req.uri());
///     Ok::<_, Infallible>(http::Response::new(Full::new(bytes::Bytes::from(body))))
/// });
///
/// let app: App<_> = App::new(maker_adaptor::http_handler(service));
///
/// let mut ctx = app.acquire();
/// ctx.request_mut().set_method("DELETE").set_request_uri("/items/3");
/// app.call(&mut ctx).await;
///
/// assert_eq!(ctx.response().body_bytes(), b"DELETE /items/3");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpHandler<T> {
    service: T,
}

impl<T> HttpHandler<T> {
    #[inline]
    pub fn new(service: T) -> Self {
        Self { service }
    }

    #[inline(always)]
    pub fn service(&self) -> &T {
        &self.service
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.service
    }
}

impl<T, B> HttpHandler<T>
where
    T: Service<http::Request<Full<Bytes>>, Response = http::Response<B>>,
    T::Error: Into<BoxError>,
    B: Body,
    B::Error: Into<BoxError>,
{
    /// Calls the service with `req` and writes its answer into `resp`.
    pub async fn serve_fast(&self, req: &Request, resp: &mut Response) -> Handled {
        match self.translate(req, resp).await {
            Ok(()) => Handled(()),
            Err(err) => {
                warn!(error = %err, "service call failed, answering 500");
                err.write_to(resp)
            }
        }
    }

    async fn translate(&self, req: &Request, resp: &mut Response) -> Result<(), ErrorKind> {
        let req = to_http_request(req)?;

        let out = Service::call(&self.service, req)
            .await
            .map_err(|e| ErrorKind::Service(e.into()))?;

        copy_response(out, resp).await
    }
}

impl<T, B, S> Handler<S> for HttpHandler<T>
where
    T: Service<http::Request<Full<Bytes>>, Response = http::Response<B>> + Send + Sync + 'static,
    T::Future: Send,
    T::Error: Into<BoxError>,
    B: Body + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
    S: ConnectionData,
{
    #[inline]
    async fn handle(&self, _: &mut S, request: &Request, response: &mut Response) -> Handled {
        self.serve_fast(request, response).await
    }
}

impl<T, B, S> RequestHandler<S> for HttpHandler<T>
where
    T: Service<http::Request<Full<Bytes>>, Response = http::Response<B>> + Send + Sync + 'static,
    T::Future: Send,
    T::Error: Into<BoxError>,
    B: Body + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
    S: ConnectionData,
{
    #[inline]
    async fn call(&self, ctx: &mut RequestCtx<S>) {
        let (_, request, response) = ctx.parts_mut();
        self.serve_fast(request, response).await;
    }
}

/// Wraps a standard-model service as a fast-model [`Handler`].
pub fn http_handler<T>(service: T) -> HttpHandler<T> {
    HttpHandler::new(service)
}

/// Wraps a standard-model service as a low-level [`RequestHandler`].
pub fn http_ctx_handler<T>(service: T) -> HttpHandler<T> {
    HttpHandler::new(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fast_handler,
        limits::{PoolLimits, ReqLimits, RespLimits},
        tools::*,
        App, CtxPool, FastService, RemoteAddr,
    };
    use http_body_util::BodyExt;
    use hyper::service::service_fn;
    use std::{
        convert::Infallible,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    type HttpReq = http::Request<Full<Bytes>>;

    /// Echoes method, URI, peer and body, and every header `k: v` as `x-echo-k: v`.
    async fn echo(req: HttpReq) -> Result<http::Response<Full<Bytes>>, Infallible> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await.unwrap().to_bytes();

        let mut resp = http::Response::builder()
            .status(http::StatusCode::ACCEPTED)
            .header("x-method", parts.method.as_str())
            .header("x-uri", parts.uri.to_string());
        if let Some(addr) = parts.extensions.get::<RemoteAddr>() {
            resp = resp.header("x-client", addr.as_str());
        }
        for (name, value) in parts.headers.iter() {
            resp = resp.header(format!("x-echo-{name}"), value);
        }

        Ok(resp.body(Full::new(body)).unwrap())
    }

    fn fast_request() -> Request {
        let mut req = Request::new(&ReqLimits::default());
        req.set_method("POST")
            .set_request_uri("/upload?id=9")
            .set_host("files.test")
            .add_header("x-tag", "a")
            .add_header("x-tag", "b")
            .add_header("x-tag", "c")
            .set_body(&[0u8, 1, 2, 255][..]);
        req.client_addr = "203.0.113.9:4444".parse().unwrap();
        req
    }

    fn fast_response() -> Response {
        Response::new(&RespLimits::default())
    }

    #[tokio::test]
    async fn handler_echo_round_trip() {
        let handler = http_handler(service_fn(echo));
        let req = fast_request();
        let mut resp = fast_response();

        let _ = Handler::handle(&handler, &mut (), &req, &mut resp).await;

        assert_eq!(resp.status_code(), 202);
        let headers = resp.headers();
        assert_eq!(headers.get_str("x-method"), Some("POST"));
        assert_eq!(headers.get_str("x-uri"), Some("/upload?id=9"));
        assert_eq!(headers.get_str("x-client"), Some("203.0.113.9:4444"));
        assert_eq!(headers.get_str("x-echo-host"), Some("files.test"));

        let tags: Vec<_> = headers.get_all("x-echo-x-tag").map(str_op).collect();
        assert_eq!(tags, ["a", "b", "c"]);
        assert_eq!(resp.body_bytes(), [0u8, 1, 2, 255]);
    }

    #[tokio::test]
    async fn ctx_handler_round_trip() {
        let handler = http_ctx_handler(service_fn(echo));
        let pool: CtxPool = CtxPool::new(
            PoolLimits::default(),
            ReqLimits::default(),
            RespLimits::default(),
        );
        let mut ctx = pool.acquire();
        *ctx.request_mut() = fast_request();

        RequestHandler::<()>::call(&handler, &mut *ctx).await;

        assert_eq!(ctx.response().status_code(), 202);
        assert_eq!(ctx.response().body_bytes(), [0u8, 1, 2, 255]);
        assert_eq!(
            ctx.response().headers().get_all("x-echo-x-tag").count(),
            3
        );
    }

    #[tokio::test]
    async fn standard_to_fast_to_standard() {
        let service: FastService<App<_>> = fast_handler(http_handler(service_fn(echo)));

        let mut req = http::Request::builder()
            .method("PUT")
            .uri("/a/b?c=d")
            .header("host", "x.test")
            .header("cookie", "a=1")
            .header("cookie", "b=2")
            .body(Full::new(Bytes::from_static(b"payload")))
            .unwrap();
        req.extensions_mut().insert(RemoteAddr::from("127.0.0.1:80"));

        let resp = service.serve(req).await;

        assert_eq!(resp.status(), http::StatusCode::ACCEPTED);
        assert_eq!(resp.headers()["x-method"], "PUT");
        assert_eq!(resp.headers()["x-uri"], "/a/b?c=d");
        assert_eq!(resp.headers()["x-client"], "127.0.0.1:80");
        assert_eq!(resp.headers().get_all("x-echo-cookie").iter().count(), 2);

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "payload");
    }

    #[tokio::test]
    async fn service_error_is_500() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = http_handler(service_fn(move |_: HttpReq| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<http::Response<Full<Bytes>>, _>(std::io::Error::other("backend down")) }
        }));

        let mut resp = fast_response();
        resp.header("x-stale", "1");
        let _ = Handler::<()>::handle(&handler, &mut (), &fast_request(), &mut resp).await;

        assert_fixed_500(&resp);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn response_body_error_is_500() {
        let handler = http_handler(service_fn(|_: HttpReq| async {
            Ok::<_, Infallible>(http::Response::new(BrokenBody))
        }));

        let mut resp = fast_response();
        let _ = Handler::<()>::handle(&handler, &mut (), &fast_request(), &mut resp).await;

        assert_fixed_500(&resp);
    }

    #[tokio::test]
    async fn unconvertible_request_is_500() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = http_handler(service_fn(move |req: HttpReq| {
            counter.fetch_add(1, Ordering::SeqCst);
            echo(req)
        }));

        #[rustfmt::skip]
        let cases: [(&str, &str, &str, &str); 3] = [
            // (method, uri, header name, header value)
            ("BAD TOKEN", "/",        "x-ok",  "v"),
            ("GET",       "/a b",     "x-ok",  "v"),
            ("GET",       "/",        "x bad", "v"),
        ];

        for (method, uri, name, value) in cases {
            let mut req = Request::new(&ReqLimits::default());
            req.set_method(method)
                .set_request_uri(uri)
                .add_header(name, value);
            let mut resp = fast_response();

            let _ = Handler::<()>::handle(&handler, &mut (), &req, &mut resp).await;
            assert_fixed_500(&resp);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    fn assert_fixed_500(resp: &Response) {
        assert_eq!(resp.status_code(), 500);
        assert_eq!(resp.headers().len(), 2);
        assert_eq!(
            resp.headers().get_str("content-type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(
            resp.headers().get_str("x-content-type-options"),
            Some("nosniff")
        );
        assert_eq!(str_op(resp.body_bytes()), "Internal Server Error");
    }
}
