use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use maker_adaptor::{ConnectionData, Handled, Handler, Request, Response, StatusCode};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

struct MyHandler;

struct Counter(usize);

impl ConnectionData for Counter {
    fn new() -> Self {
        Counter(0)
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

impl Handler<Counter> for MyHandler {
    async fn handle(&self, counter: &mut Counter, req: &Request, resp: &mut Response) -> Handled {
        counter.0 += 1;

        let user_agent = req.header_str("user-agent").unwrap_or("");
        resp.status(StatusCode::Ok)
            .header("Content-Type", "application/json")
            .body(format!(
                r#"{{"path": {:?}, "client": "{}", "user_agent": {:?}, "count": {}}}"#,
                String::from_utf8_lossy(req.path()),
                req.client_addr(),
                user_agent,
                counter.0,
            ))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let service = maker_adaptor::fast_handler(MyHandler);
    let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();

    loop {
        let (stream, peer) = listener.accept().await.unwrap();
        let service = service.with_remote_addr(peer);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::warn!(error = %err, %peer, "connection closed with error");
            }
        });
    }
}
