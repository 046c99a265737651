use crate::{limits::ReqLimits, BodyWriter, HeaderMap, Method, WriteBuffer};
use memchr::{memchr, memchr2, memmem};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Reusable HTTP request held by a pooled [`RequestCtx`](crate::RequestCtx).
///
/// Everything is stored as raw bytes exactly as the standard request carried
/// it: the method token, the request target (path and query, or the whole
/// absolute-form URI), the host, every header value and the fully read body.
/// Nothing is parsed or validated on the way in. Accessors returning `&str`
/// check UTF-8 and give `None` for anything else.
///
/// Instances are owned by the pool and handed to
/// [`Handler::handle`](crate::Handler::handle) or
/// [`RequestHandler::call`](crate::RequestHandler::call). After a request
/// completes every field is reset:
///
/// | Field | Reset value |
/// |-------|-------------|
/// | method | `GET` |
/// | request URI | `/` |
/// | host, headers, body | empty |
/// | content length | `None` |
/// | client address | `0.0.0.0:0` |
///
/// # Examples
/// ```
/// # maker_adaptor::run_test(|req, resp| {
/// use maker_adaptor::{Method, StatusCode};
///
/// match (req.method(), req.path()) {
///     (Some(Method::Get), b"/") => resp.status(StatusCode::Ok).body("index"),
///     (Some(Method::Post), b"/upload") => resp
///         .status(StatusCode::Created)
///         .body(req.body().len()),
///     _ => resp.status(StatusCode::NotFound).body("not found"),
/// }
/// # });
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub(crate) method: Vec<u8>,
    pub(crate) uri: Vec<u8>,
    pub(crate) host: Vec<u8>,

    pub(crate) headers: HeaderMap,
    pub(crate) content_length: Option<usize>,
    pub(crate) body: Vec<u8>,

    pub(crate) client_addr: SocketAddr,
}

impl Request {
    pub(crate) const UNKNOWN_CLIENT: SocketAddr =
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

    #[inline]
    pub(crate) fn new(limits: &ReqLimits) -> Self {
        let mut uri = Vec::with_capacity(limits.url_size.max(1));
        uri.push(b'/');

        Request {
            method: b"GET".to_vec(),
            uri,
            host: Vec::new(),

            headers: HeaderMap::with_capacity(limits.header_count, limits.header_bytes),
            content_length: None,
            body: Vec::with_capacity(limits.body_size),

            client_addr: Self::UNKNOWN_CLIENT,
        }
    }

    #[inline]
    pub(crate) fn reset(&mut self, limits: &ReqLimits) {
        self.method.clear();
        self.method.extend_from_slice(b"GET");

        reuse(&mut self.uri, limits.max_capacity, limits.url_size);
        self.uri.push(b'/');
        reuse(&mut self.host, limits.max_capacity, 0);

        self.headers
            .reset(limits.max_capacity, limits.header_count, limits.header_bytes);
        self.content_length = None;
        reuse(&mut self.body, limits.max_capacity, limits.body_size);

        self.client_addr = Self::UNKNOWN_CLIENT;
    }
}

#[inline(always)]
fn reuse(buffer: &mut Vec<u8>, max: usize, initial: usize) {
    if buffer.capacity() > max {
        *buffer = Vec::with_capacity(initial);
    } else {
        buffer.clear();
    }
}

// Method and target
impl Request {
    /// Returns the method if it is one of the registered [`Method`]s.
    #[inline]
    pub fn method(&self) -> Option<Method> {
        Method::from_bytes(&self.method)
    }

    /// Returns the raw method token, including extension methods.
    #[inline(always)]
    pub fn method_bytes(&self) -> &[u8] {
        &self.method
    }

    #[inline]
    pub fn set_method<T: WriteBuffer>(&mut self, method: T) -> &mut Self {
        self.method.clear();
        method.write_to(&mut self.method);
        self
    }

    /// Returns the full request target, query included.
    #[inline(always)]
    pub fn uri(&self) -> &[u8] {
        &self.uri
    }

    #[inline]
    pub fn uri_str(&self) -> Option<&str> {
        simdutf8::basic::from_utf8(&self.uri).ok()
    }

    #[inline]
    pub fn set_request_uri<T: WriteBuffer>(&mut self, uri: T) -> &mut Self {
        self.uri.clear();
        uri.write_to(&mut self.uri);
        self
    }

    /// Returns the path component of the request target.
    ///
    /// For an absolute-form target (`http://host/a?b`) the scheme and
    /// authority are skipped, and a target without a path yields `/`.
    ///
    /// # Examples
    /// ```
    /// # maker_adaptor::run_test(|req, resp| {
    /// # let mut req = req.clone();
    /// req.set_request_uri("http://example.com/users?id=7");
    /// assert_eq!(req.path(), b"/users");
    /// assert_eq!(req.query(), Some(&b"id=7"[..]));
    /// # resp.finish()
    /// # });
    /// ```
    #[inline]
    pub fn path(&self) -> &[u8] {
        let target = self.origin_form();

        match memchr(b'?', target) {
            Some(0) => b"/",
            Some(i) => &target[..i],
            None => target,
        }
    }

    /// Returns the raw query string without the leading `?`.
    #[inline]
    pub fn query(&self) -> Option<&[u8]> {
        let target = self.origin_form();
        memchr(b'?', target).map(|i| &target[i + 1..])
    }

    /// Returns the raw (not percent-decoded) value of the first `key` query
    /// parameter. A bare `key` without `=` yields an empty value.
    ///
    /// # Examples
    /// ```
    /// # maker_adaptor::run_test(|req, resp| {
    /// # let mut req = req.clone();
    /// req.set_request_uri("/search?q=rust&page=2&debug");
    ///
    /// assert_eq!(req.query_arg("q"), Some(&b"rust"[..]));
    /// assert_eq!(req.query_arg("debug"), Some(&b""[..]));
    /// assert_eq!(req.query_arg("missing"), None);
    /// # resp.finish()
    /// # });
    /// ```
    pub fn query_arg<K: AsRef<[u8]>>(&self, key: K) -> Option<&[u8]> {
        let key = key.as_ref();

        self.query()?.split(|&b| b == b'&').find_map(|pair| {
            let (name, value) = match memchr(b'=', pair) {
                Some(i) => (&pair[..i], &pair[i + 1..]),
                None => (pair, &pair[pair.len()..]),
            };
            (name == key).then_some(value)
        })
    }

    #[inline]
    fn origin_form(&self) -> &[u8] {
        let uri = &self.uri[..];
        if uri.first() == Some(&b'/') {
            return uri;
        }

        match memmem::find(uri, b"://") {
            Some(i) => {
                let rest = &uri[i + 3..];
                match memchr2(b'/', b'?', rest) {
                    Some(j) => &rest[j..],
                    None => b"/",
                }
            }
            None => uri,
        }
    }

    #[inline(always)]
    pub fn host(&self) -> &[u8] {
        &self.host
    }

    #[inline]
    pub fn set_host<T: WriteBuffer>(&mut self, host: T) -> &mut Self {
        self.host.clear();
        host.write_to(&mut self.host);
        self
    }
}

// Headers and body
impl Request {
    #[inline(always)]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline(always)]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the first header value with case-insensitive name matching.
    /// Uses linear search.
    #[inline]
    pub fn header<N: AsRef<[u8]>>(&self, name: N) -> Option<&[u8]> {
        self.headers.get(name)
    }

    /// Same as [`header`](Self::header), but only for UTF-8 values.
    #[inline]
    pub fn header_str<N: AsRef<[u8]>>(&self, name: N) -> Option<&str> {
        self.headers.get_str(name)
    }

    /// Appends a header value, keeping existing values with the same name.
    #[inline]
    pub fn add_header<N: WriteBuffer, V: WriteBuffer>(&mut self, name: N, value: V) -> &mut Self {
        self.headers.add(name, value);
        self
    }

    /// Returns the declared body length.
    ///
    /// Requests translated from the standard model always carry the number
    /// of body bytes actually read.
    #[inline(always)]
    pub const fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    #[inline]
    pub fn set_content_length(&mut self, length: usize) -> &mut Self {
        self.content_length = Some(length);
        self
    }

    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replaces the body. The content length is left untouched.
    #[inline]
    pub fn set_body<T: WriteBuffer>(&mut self, body: T) -> &mut Self {
        self.body.clear();
        body.write_to(&mut self.body);
        self
    }

    /// Returns a writer appending to the current body.
    #[inline]
    pub fn body_writer(&mut self) -> BodyWriter<'_> {
        BodyWriter(&mut self.body)
    }

    /// Returns the resolved address of the remote peer.
    #[inline(always)]
    pub const fn client_addr(&self) -> &SocketAddr {
        &self.client_addr
    }
}
