use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use maker_adaptor::{RequestCtx, RequestHandler, StatusCode};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

struct Echo;

impl RequestHandler for Echo {
    async fn call(&self, ctx: &mut RequestCtx) {
        let (_, req, resp) = ctx.parts_mut();

        resp.status(StatusCode::Ok)
            .header("x-method", req.method_bytes())
            .header("x-uri", req.uri());
        for (name, value) in req.headers().iter() {
            let mut echoed = b"x-echo-".to_vec();
            echoed.extend_from_slice(name);
            resp.headers_mut().add(echoed, value);
        }
        let _ = resp.body(req.body());
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let service = maker_adaptor::ctx_handler(Echo);
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
