use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use maker_adaptor::{limits::ReqLimits, App, RemoteAddr};
use std::convert::Infallible;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

// A plain hyper service, unaware of pooled contexts
async fn shout(req: http::Request<Full<Bytes>>) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let client = req
        .extensions()
        .get::<RemoteAddr>()
        .map_or("unknown", RemoteAddr::as_str)
        .to_owned();
    let body = req.into_body().collect().await?.to_bytes();

    let resp = http::Response::builder()
        .header("content-type", "text/plain")
        .header("x-client", client)
        .body(Full::new(Bytes::from(body.to_ascii_uppercase())))
        .unwrap_or_default();
    Ok(resp)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // standard service -> pooled app -> standard server
    let app: App<_> = App::builder()
        .handler(maker_adaptor::http_handler(service_fn(shout)))
        .request_limits(ReqLimits {
            max_body_size: Some(64 * 1024),
            ..ReqLimits::default()
        })
        .build();
    let service = maker_adaptor::fast_app(app);

    let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();

    loop {
        let (stream, peer) = listener.accept().await.unwrap();
        let service = service.with_remote_addr(peer);

        tokio::spawn(async move {
            let _ = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await;
        });
    }
}
