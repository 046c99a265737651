//! Reusable response builder for pooled contexts.

use crate::{limits::RespLimits, BodyWriter, HeaderMap, StatusCode, WriteBuffer};

/// HTTP response filled in by a handler and copied out by the adaptor.
///
/// Unlike a wire-level response writer, nothing here is serialized until the
/// handler returns: status, headers and body can be set in any order and
/// overwritten freely. The status defaults to `200 OK`.
///
/// Instances are created by the pool and passed to
/// [`Handler::handle`](crate::Handler::handle).
///
/// # Examples
/// ```
/// use maker_adaptor::{Handled, Request, Response, StatusCode};
///
/// // In your implementation `Handler`
/// async fn handle(_req: &Request, resp: &mut Response) -> Handled {
///     resp
///         .status(StatusCode::Ok)
///         .header("content-type", "text/html")
///         .body("<h1>Hello World</h1>")
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub(crate) status: u16,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
}

/// Proof that a handler produced a response.
#[doc(hidden)]
#[derive(Debug)]
pub struct Handled(pub(crate) ());

impl Response {
    #[inline]
    pub(crate) fn new(limits: &RespLimits) -> Self {
        Self {
            status: StatusCode::Ok.as_u16(),
            headers: HeaderMap::with_capacity(limits.header_count, limits.header_bytes),
            body: Vec::with_capacity(limits.default_capacity),
        }
    }

    #[inline]
    pub(crate) fn reset(&mut self, limits: &RespLimits) {
        if self.body.capacity() > limits.max_capacity {
            self.body = Vec::with_capacity(limits.default_capacity);
        } else {
            self.body.clear();
        }

        self.headers
            .reset(limits.max_capacity, limits.header_count, limits.header_bytes);
        self.status = StatusCode::Ok.as_u16();
    }

    /// Drops everything written so far while keeping the buffers.
    #[inline]
    pub(crate) fn clear(&mut self) {
        self.status = StatusCode::Ok.as_u16();
        self.headers.clear();
        self.body.clear();
    }
}

impl Response {
    /// Sets the HTTP status code for the response.
    ///
    /// # Examples
    /// ```
    /// # maker_adaptor::run_test(|_, resp| {
    /// use maker_adaptor::StatusCode;
    ///
    /// resp.status(StatusCode::NotFound)
    ///     .body(r#"{"status": "not found", "code": 404}"#)
    /// # });
    /// ```
    #[inline]
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status.as_u16();
        self
    }

    /// Sets a numeric status code, including unregistered ones.
    ///
    /// Codes outside `100..=999` cannot be represented by a standard
    /// response, so the adaptor answers `500 Internal Server Error` instead.
    #[inline]
    pub fn set_status_code(&mut self, code: u16) -> &mut Self {
        self.status = code;
        self
    }

    #[inline(always)]
    pub const fn status_code(&self) -> u16 {
        self.status
    }

    /// Adds a header to the response, keeping earlier values of the same name.
    ///
    /// # Examples
    /// ```
    /// # maker_adaptor::run_test(|_, resp| {
    /// use maker_adaptor::StatusCode;
    ///
    /// resp.status(StatusCode::Ok)
    ///     .header("content-type", "text/plain")        // &str, &str
    ///     .header("x-custom-id", 128)                  // &str, i32
    ///     .header("x-cache-enabled", true)             // &str, bool
    ///     .body("Done")
    /// # });
    /// ```
    #[inline]
    pub fn header<N: WriteBuffer, V: WriteBuffer>(&mut self, name: N, value: V) -> &mut Self {
        self.headers.add(name, value);
        self
    }

    #[inline(always)]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline(always)]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Replaces the response body and finalizes the response.
    ///
    /// # Examples
    /// ```
    /// # maker_adaptor::run_test(|_, resp| {
    /// use maker_adaptor::StatusCode;
    ///
    /// resp.status(StatusCode::Ok)
    ///     .header("content-type", "text/plain")
    ///     .body("Hello, World!")
    /// # });
    /// ```
    #[inline]
    pub fn body<T: WriteBuffer>(&mut self, data: T) -> Handled {
        self.body.clear();
        data.write_to(&mut self.body);
        Handled(())
    }

    /// Replaces the response body with the output of a closure and
    /// finalizes the response.
    ///
    /// # Examples
    /// ```
    /// # maker_adaptor::run_test(|req, resp| {
    /// use maker_adaptor::StatusCode;
    ///
    /// resp.status(StatusCode::Ok).body_with(|w| {
    ///     w.write("path: ");
    ///     w.write(req.path());
    /// })
    /// # });
    /// ```
    #[inline]
    pub fn body_with<F: FnOnce(&mut BodyWriter)>(&mut self, f: F) -> Handled {
        self.body.clear();
        f(&mut BodyWriter(&mut self.body));
        Handled(())
    }

    /// Appends to the body without finalizing.
    #[inline]
    pub fn append_body<T: WriteBuffer>(&mut self, data: T) -> &mut Self {
        data.write_to(&mut self.body);
        self
    }

    /// Returns the body written so far.
    #[inline(always)]
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Finalizes the response as it is.
    #[inline(always)]
    pub fn finish(&mut self) -> Handled {
        Handled(())
    }
}
