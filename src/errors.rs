use crate::{Handled, Response, StatusCode};
use bytes::Bytes;
use http_body_util::Full;

/// Boxed error accepted from services, bodies and handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const FALLBACK_BODY: &str = "Internal Server Error";
const FALLBACK_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Every way a single translation can fail. None of them is reported to the
/// client beyond a fixed `500 Internal Server Error`.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ErrorKind {
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] BoxError),
    #[error("failed to resolve remote address {0:?}")]
    RemoteAddr(String),

    #[error("invalid request method")]
    InvalidMethod,
    #[error("invalid request uri")]
    InvalidUri,
    #[error("invalid header name or value")]
    InvalidHeader,
    #[error("too many headers")]
    TooManyHeaders,
    #[error("invalid response status code {0}")]
    InvalidStatus(u16),

    #[error("service failed: {0}")]
    Service(#[source] BoxError),
    #[error("failed to read response body: {0}")]
    ResponseBody(#[source] BoxError),
}

impl ErrorKind {
    /// Builds the fixed standard-model failure response.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut resp = http::Response::new(Full::new(Bytes::from_static(FALLBACK_BODY.as_bytes())));

        *resp.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
        let headers = resp.headers_mut();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static(FALLBACK_CONTENT_TYPE),
        );
        headers.insert(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        );
        resp
    }

    /// Replaces whatever was written to a pooled response with the fixed
    /// failure response.
    pub(crate) fn write_to(self, resp: &mut Response) -> Handled {
        resp.clear();

        resp.status(StatusCode::InternalServerError)
            .header("content-type", FALLBACK_CONTENT_TYPE)
            .header("x-content-type-options", "nosniff")
            .body(FALLBACK_BODY)
    }
}

impl From<http::method::InvalidMethod> for ErrorKind {
    fn from(_: http::method::InvalidMethod) -> Self {
        ErrorKind::InvalidMethod
    }
}

impl From<http::uri::InvalidUri> for ErrorKind {
    fn from(_: http::uri::InvalidUri) -> Self {
        ErrorKind::InvalidUri
    }
}

impl From<http::header::InvalidHeaderName> for ErrorKind {
    fn from(_: http::header::InvalidHeaderName) -> Self {
        ErrorKind::InvalidHeader
    }
}

impl From<http::header::InvalidHeaderValue> for ErrorKind {
    fn from(_: http::header::InvalidHeaderValue) -> Self {
        ErrorKind::InvalidHeader
    }
}

impl From<http::header::MaxSizeReached> for ErrorKind {
    fn from(_: http::header::MaxSizeReached) -> Self {
        ErrorKind::TooManyHeaders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{limits::RespLimits, tools::*};
    use http_body_util::BodyExt;

    fn errors() -> Vec<ErrorKind> {
        vec![
            ErrorKind::BodyRead("reset".into()),
            ErrorKind::RemoteAddr("garbage".into()),
            ErrorKind::InvalidMethod,
            ErrorKind::InvalidUri,
            ErrorKind::InvalidHeader,
            ErrorKind::TooManyHeaders,
            ErrorKind::InvalidStatus(1000),
            ErrorKind::Service("down".into()),
            ErrorKind::ResponseBody("truncated".into()),
        ]
    }

    #[tokio::test]
    async fn http_response_is_fixed() {
        for err in errors() {
            let resp = err.into_http();

            assert_eq!(resp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                resp.headers()["content-type"],
                "text/plain; charset=utf-8"
            );
            assert_eq!(resp.headers()["x-content-type-options"], "nosniff");

            let body = resp.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(body, "Internal Server Error");
        }
    }

    #[test]
    fn fast_response_is_fixed() {
        for err in errors() {
            let mut resp = Response::new(&RespLimits::default());
            resp.set_status_code(201).header("x-partial", "yes");
            resp.append_body("half written");

            let _ = err.write_to(&mut resp);

            assert_eq!(resp.status_code(), 500);
            assert_eq!(resp.headers().len(), 2);
            assert_eq!(resp.headers().get("x-partial"), None);
            assert_eq!(
                resp.headers().get_str("content-type"),
                Some("text/plain; charset=utf-8")
            );
            assert_eq!(str_op(resp.body_bytes()), "Internal Server Error");
        }
    }

    #[test]
    fn display() {
        assert_eq!(
            ErrorKind::InvalidStatus(1000).to_string(),
            "invalid response status code 1000"
        );
        assert_eq!(
            ErrorKind::RemoteAddr(String::new()).to_string(),
            r#"failed to resolve remote address """#
        );
    }
}
