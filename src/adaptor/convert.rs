//! Stateless conversions between `http` types and the pooled model.

use crate::{
    errors::{BoxError, ErrorKind},
    limits::ReqLimits,
    BodyWriter, Request, Response,
};
use bytes::Bytes;
use http::{header::HOST, HeaderName, HeaderValue};
use http_body::Body;
use http_body_util::{BodyExt, Full, Limited};
use std::{fmt, io::Write, net::SocketAddr};

/// Textual address of the remote peer, carried as an `http` request extension.
///
/// A standard server inserts it per request (or stamps a whole connection
/// with [`FastService::with_remote_addr`](crate::FastService::with_remote_addr)).
/// It is resolved into a [`SocketAddr`] before a fast-model handler runs:
/// literal `ip:port` first, then a host lookup. Requests going the other way
/// carry the fast request's client address in the same extension.
///
/// # Examples
/// ```
/// use maker_adaptor::RemoteAddr;
///
/// let mut req = http::Request::new(());
/// req.extensions_mut().insert(RemoteAddr::from("192.0.2.7:5000"));
///
/// assert_eq!(req.extensions().get::<RemoteAddr>().unwrap().as_str(), "192.0.2.7:5000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RemoteAddr(pub String);

impl RemoteAddr {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<SocketAddr> for RemoteAddr {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl From<&str> for RemoteAddr {
    fn from(addr: &str) -> Self {
        Self(addr.to_owned())
    }
}

impl From<String> for RemoteAddr {
    fn from(addr: String) -> Self {
        Self(addr)
    }
}

impl fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads a whole request body, honoring [`ReqLimits::max_body_size`].
pub(crate) async fn read_body<B>(body: B, limits: &ReqLimits) -> Result<Bytes, ErrorKind>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let collected = match limits.max_body_size {
        Some(max) => Limited::new(body, max)
            .collect()
            .await
            .map_err(ErrorKind::BodyRead)?,
        None => body
            .collect()
            .await
            .map_err(|e| ErrorKind::BodyRead(e.into()))?,
    };

    Ok(collected.to_bytes())
}

/// Fills a pooled request from the head of a standard request and its body.
pub(crate) fn copy_request(parts: &http::request::Parts, body: &[u8], req: &mut Request) {
    req.set_method(parts.method.as_str());

    req.uri.clear();
    // Writing into a `Vec` cannot fail
    let _ = write!(BodyWriter(&mut req.uri), "{}", parts.uri);

    let host = match parts.headers.get(HOST) {
        Some(host) => host.as_bytes(),
        None => parts.uri.authority().map_or(&b""[..], |a| a.as_str().as_bytes()),
    };
    req.set_host(host);

    for (name, value) in parts.headers.iter() {
        req.headers.add(name, value);
    }

    req.content_length = Some(body.len());
    req.body.clear();
    req.body.extend_from_slice(body);
}

/// Resolves a textual peer address: literal `ip:port` first, then a lookup.
pub(crate) async fn resolve_remote_addr(addr: &str) -> Result<SocketAddr, ErrorKind> {
    if let Ok(addr) = addr.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if addr.is_empty() {
        return Err(ErrorKind::RemoteAddr(String::new()));
    }

    match tokio::net::lookup_host(addr).await {
        Ok(mut addrs) => addrs
            .next()
            .ok_or_else(|| ErrorKind::RemoteAddr(addr.to_owned())),
        Err(_) => Err(ErrorKind::RemoteAddr(addr.to_owned())),
    }
}

/// Builds a standard response from a pooled one: status, then every header
/// value, then the body.
pub(crate) fn to_http_response(resp: &Response) -> Result<http::Response<Full<Bytes>>, ErrorKind> {
    let status = http::StatusCode::from_u16(resp.status)
        .map_err(|_| ErrorKind::InvalidStatus(resp.status))?;

    let mut out = http::Response::new(Full::default());
    *out.status_mut() = status;

    let headers = out.headers_mut();
    headers.try_reserve(resp.headers.len())?;
    for (name, value) in resp.headers.iter() {
        headers.try_append(HeaderName::from_bytes(name)?, HeaderValue::from_bytes(value)?)?;
    }

    *out.body_mut() = Full::new(Bytes::copy_from_slice(&resp.body));
    Ok(out)
}

/// Builds a standard request from a pooled one.
pub(crate) fn to_http_request(req: &Request) -> Result<http::Request<Full<Bytes>>, ErrorKind> {
    let method = http::Method::from_bytes(&req.method)?;
    let uri = http::Uri::try_from(&req.uri[..])?;

    let mut out = http::Request::new(Full::new(Bytes::copy_from_slice(&req.body)));
    *out.method_mut() = method;
    *out.uri_mut() = uri;

    let headers = out.headers_mut();
    headers.try_reserve(req.headers.len() + 1)?;
    for (name, value) in req.headers.iter() {
        headers.try_append(HeaderName::from_bytes(name)?, HeaderValue::from_bytes(value)?)?;
    }
    if !req.host.is_empty() && !headers.contains_key(HOST) {
        headers.try_insert(HOST, HeaderValue::from_bytes(&req.host)?)?;
    }

    out.extensions_mut()
        .insert(RemoteAddr::from(req.client_addr));
    Ok(out)
}

/// Collects a standard response and copies it into a pooled one.
///
/// The body is read first, so a failing body leaves `target` untouched.
pub(crate) async fn copy_response<B>(
    resp: http::Response<B>,
    target: &mut Response,
) -> Result<(), ErrorKind>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let (parts, body) = resp.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| ErrorKind::ResponseBody(e.into()))?
        .to_bytes();

    target.set_status_code(parts.status.as_u16());
    for (name, value) in parts.headers.iter() {
        target.headers.add(name, value);
    }
    target.body.clear();
    target.body.extend_from_slice(&body);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{limits::RespLimits, tools::*, Method, StatusCode};
    use std::net::{IpAddr, Ipv4Addr};

    fn http_request(uri: &str) -> http::Request<()> {
        http::Request::builder()
            .method("PUT")
            .uri(uri)
            .header("host", "example.com")
            .header("accept", "text/html")
            .header("x-tag", "a")
            .header("x-tag", "b")
            .header("x-tag", "c")
            .body(())
            .unwrap()
    }

    fn fast_request() -> Request {
        Request::new(&ReqLimits::default())
    }

    #[test]
    fn copy_request_fields() {
        let (parts, ()) = http_request("/items?page=2&sort=asc").into_parts();
        let mut req = fast_request();

        copy_request(&parts, b"\x00binary\xffbody", &mut req);

        assert_eq!(req.method(), Some(Method::Put));
        assert_eq!(str_op(req.uri()), "/items?page=2&sort=asc");
        assert_eq!(req.query_arg("sort"), Some(&b"asc"[..]));
        assert_eq!(str_op(req.host()), "example.com");
        assert_eq!(req.body(), b"\x00binary\xffbody");
        assert_eq!(req.content_length(), Some(12));

        let tags: Vec<_> = req.headers().get_all("x-tag").map(str_op).collect();
        assert_eq!(tags, ["a", "b", "c"]);
        assert_eq!(req.headers().len(), 5);
    }

    #[test]
    fn copy_request_host_fallback() {
        #[rustfmt::skip]
        let cases = [
            // (uri, host header, host, uri)
            ("http://a.test:8080/x?y=1", None,           "a.test:8080", "http://a.test:8080/x?y=1"),
            ("http://a.test/x",          Some("b.test"), "b.test",      "http://a.test/x"),
            ("/only/path",               None,           "",            "/only/path"),
        ];

        for (uri, header, host, target) in cases {
            let mut builder = http::Request::builder().uri(uri);
            if let Some(header) = header {
                builder = builder.header("host", header);
            }
            let (parts, ()) = builder.body(()).unwrap().into_parts();

            let mut req = fast_request();
            copy_request(&parts, b"", &mut req);

            assert_eq!(str_op(req.host()), host, "{uri:?}");
            assert_eq!(str_op(req.uri()), target, "{uri:?}");
            assert_eq!(req.content_length(), Some(0));
        }
    }

    #[tokio::test]
    async fn resolve_addresses() {
        #[rustfmt::skip]
        let cases = [
            ("127.0.0.1:8080",  Some("127.0.0.1:8080")),
            ("[::1]:443",       Some("[::1]:443")),
            ("",                None),
            ("127.0.0.1",       None),
            ("garbage",         None),
            ("1.2.3.4:99999",   None),
        ];

        for (input, expected) in cases {
            let resolved = resolve_remote_addr(input).await.ok().map(|a| a.to_string());
            assert_eq!(resolved.as_deref(), expected, "{input:?}");
        }

        // Not a literal, goes through a host lookup
        let resolved = resolve_remote_addr("localhost:8080").await.unwrap();
        assert_eq!(resolved.port(), 8080);
        assert!(resolved.ip().is_loopback());
    }

    #[tokio::test]
    async fn read_body_limit() {
        let unlimited = ReqLimits::default();
        let limited = ReqLimits {
            max_body_size: Some(4),
            ..ReqLimits::default()
        };

        let body = read_body(Full::new(Bytes::from_static(b"12345")), &unlimited).await;
        assert_eq!(body.unwrap(), "12345");

        let body = read_body(Full::new(Bytes::from_static(b"1234")), &limited).await;
        assert_eq!(body.unwrap(), "1234");

        let body = read_body(Full::new(Bytes::from_static(b"12345")), &limited).await;
        assert!(matches!(body, Err(ErrorKind::BodyRead(_))));
    }

    #[test]
    fn response_to_http() {
        let mut resp = Response::new(&RespLimits::default());
        resp.status(StatusCode::Created)
            .header("set-cookie", "a=1")
            .header("Set-Cookie", "b=2")
            .header("x-id", 7)
            .append_body(&[0u8, 159, 146, 150][..]);

        let out = to_http_response(&resp).unwrap();

        assert_eq!(out.status(), http::StatusCode::CREATED);
        let cookies: Vec<_> = out.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
        assert_eq!(out.headers()["x-id"], "7");
    }

    #[test]
    fn response_to_http_rejects() {
        let mut resp = Response::new(&RespLimits::default());
        resp.set_status_code(1000);
        assert!(matches!(
            to_http_response(&resp),
            Err(ErrorKind::InvalidStatus(1000))
        ));

        #[rustfmt::skip]
        let headers: [(&[u8], &[u8]); 3] = [
            (b"bad name",  b"v"),
            (b"",          b"v"),
            (b"x-newline", b"a\r\nb"),
        ];

        for (name, value) in headers {
            let mut resp = Response::new(&RespLimits::default());
            resp.header(name, value);

            assert!(matches!(
                to_http_response(&resp),
                Err(ErrorKind::InvalidHeader)
            ));
        }

        // More entries than `http::HeaderMap` can hold
        let mut resp = Response::new(&RespLimits::default());
        for i in 0..40_000 {
            resp.header("x-h", i);
        }
        assert!(matches!(
            to_http_response(&resp),
            Err(ErrorKind::TooManyHeaders)
        ));
    }

    #[test]
    fn request_to_http() {
        let mut req = fast_request();
        req.set_method("PATCH")
            .set_request_uri("/users/1?fields=name")
            .set_host("api.test")
            .add_header("x-tag", "a")
            .add_header("x-tag", "b")
            .set_body("{}");
        req.client_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)), 4000);

        let out = to_http_request(&req).unwrap();

        assert_eq!(out.method(), http::Method::PATCH);
        assert_eq!(out.uri(), "/users/1?fields=name");
        assert_eq!(out.headers()["host"], "api.test");
        assert_eq!(out.headers().get_all("x-tag").iter().count(), 2);
        assert_eq!(
            out.extensions().get::<RemoteAddr>(),
            Some(&RemoteAddr::from("10.1.2.3:4000"))
        );

        // An explicit host header wins over the host field
        req.add_header("Host", "other.test");
        let out = to_http_request(&req).unwrap();
        assert_eq!(out.headers().get_all("host").iter().count(), 1);
        assert_eq!(out.headers()["host"], "other.test");
    }

    #[test]
    fn request_to_http_rejects() {
        let mut req = fast_request();
        req.set_method("BAD METHOD");
        assert!(matches!(to_http_request(&req), Err(ErrorKind::InvalidMethod)));

        let mut req = fast_request();
        req.set_request_uri("/with space");
        assert!(matches!(to_http_request(&req), Err(ErrorKind::InvalidUri)));

        let mut req = fast_request();
        for i in 0..40_000 {
            req.add_header("x-h", i);
        }
        assert!(matches!(to_http_request(&req), Err(ErrorKind::TooManyHeaders)));
    }

    #[tokio::test]
    async fn response_from_http() {
        let resp = http::Response::builder()
            .status(404)
            .header("vary", "accept")
            .header("vary", "origin")
            .body(Full::new(Bytes::from_static(b"missing")))
            .unwrap();
        let mut target = Response::new(&RespLimits::default());

        copy_response(resp, &mut target).await.unwrap();

        assert_eq!(target.status_code(), 404);
        let vary: Vec<_> = target.headers().get_all("vary").map(str_op).collect();
        assert_eq!(vary, ["accept", "origin"]);
        assert_eq!(str_op(target.body_bytes()), "missing");
    }
}
