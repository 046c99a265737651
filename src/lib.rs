//! maker_adaptor - Adaptors between pooled-context HTTP handlers and hyper/`http` services
//!
//! Two ways of writing an HTTP handler rarely meet:
//!
//! - **standard model**: one heap-allocated `http::Request<B>` per request,
//!   served through [`hyper::service::Service`];
//! - **pooled model**: a reusable [`RequestCtx`] (request, response and user
//!   data) drawn from a lock-free [`CtxPool`], handled by a [`Handler`] or a
//!   lower-level [`RequestHandler`].
//!
//! This crate translates a single request and its response between them, in
//! four directions:
//!
//! | Function | From | To |
//! |----------|------|----|
//! | [`fast_handler`], [`fast_app`] | [`Handler`] / [`App`] | hyper `Service` ([`FastService`]) |
//! | [`ctx_handler`] | [`RequestHandler`] | hyper `Service` ([`FastService`]) |
//! | [`http_handler`] | hyper `Service` | [`Handler`] ([`HttpHandler`]) |
//! | [`http_ctx_handler`] | hyper `Service` | [`RequestHandler`] ([`HttpHandler`]) |
//!
//! Every translation reads the whole body into memory, copies each header
//! value one by one (multiplicity is kept, nothing is merged) and answers a
//! fixed `500 Internal Server Error` when the body cannot be read, the peer
//! address cannot be resolved or the other side produced something the
//! target model cannot represent.
//!
//! # Examples
//!
//! A pooled-context handler behind hyper:
//! ```no_run
//! use hyper::server::conn::http1;
//! use hyper_util::rt::TokioIo;
//! use maker_adaptor::{Handled, Handler, Request, Response, StatusCode};
//! use tokio::net::TcpListener;
//!
//! struct MyHandler;
//!
//! impl Handler for MyHandler {
//!     async fn handle(&self, _: &mut (), req: &Request, resp: &mut Response) -> Handled {
//!         match req.path() {
//!             b"/" => resp.status(StatusCode::Ok).body("Hello World!"),
//!             _ => resp.status(StatusCode::NotFound).body("Not found"),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = maker_adaptor::fast_handler(MyHandler);
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!
//!     loop {
//!         let (stream, peer) = listener.accept().await.unwrap();
//!         let service = service.with_remote_addr(peer);
//!
//!         tokio::spawn(async move {
//!             let _ = http1::Builder::new()
//!                 .serve_connection(TokioIo::new(stream), service)
//!                 .await;
//!         });
//!     }
//! }
//! ```
//! A hyper service inside a pooled [`App`]:
//! ```
//! use http_body_util::Full;
//! use hyper::service::service_fn;
//! use maker_adaptor::{App, RequestHandler};
//! use std::convert::Infallible;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let hello = service_fn(|_: http::Request<Full<bytes::Bytes>>| async {
//!     Ok::<_, Infallible>(http::Response::new(Full::new(bytes::Bytes::from("hi"))))
//! });
//! let app: App<_> = App::new(maker_adaptor::http_handler(hello));
//!
//! let mut ctx = app.acquire();
//! app.call(&mut ctx).await;
//! assert_eq!(ctx.response().body_bytes(), b"hi");
//! # }
//! ```

pub(crate) mod fast {
    pub(crate) mod app;
    pub(crate) mod ctx;
    pub(crate) mod header;
    pub(crate) mod pool;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
    pub(crate) mod write;
}
pub(crate) mod adaptor {
    pub(crate) mod convert;
    pub(crate) mod from_http;
    pub(crate) mod to_http;
}
pub(crate) mod errors;
pub mod limits;

pub use crate::{
    adaptor::{
        convert::RemoteAddr,
        from_http::{http_ctx_handler, http_handler, HttpHandler},
        to_http::{ctx_handler, fast_app, fast_handler, FastService},
    },
    errors::BoxError,
    fast::{
        app::{App, AppBuilder, Handler},
        ctx::{ConnectionData, RequestCtx, RequestHandler},
        header::HeaderMap,
        pool::{CtxPool, PoolStats, PooledCtx},
        request::Request,
        response::{Handled, Response},
        types::{Method, StatusCode},
        write::{BodyWriter, WriteBuffer},
    },
};

#[doc(hidden)]
pub fn run_test<F: FnOnce(&Request, &mut Response) -> Handled>(f: F) {
    f(
        &Request::new(&crate::limits::ReqLimits::default()),
        &mut Response::new(&crate::limits::RespLimits::default()),
    );
}

#[doc(hidden)]
#[macro_export]
macro_rules! impt_default_handler {
    ($name:ident) => {
        use maker_adaptor::{Handled, Handler, Request, Response, StatusCode};
        struct $name;

        impl Handler<()> for $name {
            async fn handle(&self, _: &mut (), _: &Request, resp: &mut Response) -> Handled {
                resp.status(StatusCode::Ok).body("Hello world!")
            }
        }
    };
}
