use crate::{
    limits::{ReqLimits, RespLimits},
    Request, Response,
};
use std::{future::Future, net::SocketAddr};

/// A pooled request context: one reusable [`Request`], one reusable
/// [`Response`] and the user data kept with them.
///
/// Contexts are drawn from a [`CtxPool`](crate::CtxPool) for exactly one
/// request and reset before going back, so nothing but buffer capacity and
/// the (reset) user data outlives a request.
#[derive(Debug)]
pub struct RequestCtx<S = ()> {
    pub(crate) request: Request,
    pub(crate) response: Response,
    pub(crate) data: S,
}

impl<S: ConnectionData> RequestCtx<S> {
    #[inline]
    pub(crate) fn new(req_limits: &ReqLimits, resp_limits: &RespLimits) -> Self {
        Self {
            request: Request::new(req_limits),
            response: Response::new(resp_limits),
            data: S::new(),
        }
    }

    #[inline]
    pub(crate) fn reset(&mut self, req_limits: &ReqLimits, resp_limits: &RespLimits) {
        self.request.reset(req_limits);
        self.response.reset(resp_limits);
        self.data.reset();
    }
}

impl<S> RequestCtx<S> {
    /// Returns the resolved address of the remote peer.
    #[inline(always)]
    pub fn remote_addr(&self) -> SocketAddr {
        self.request.client_addr
    }

    #[inline(always)]
    pub fn request(&self) -> &Request {
        &self.request
    }

    #[inline(always)]
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    #[inline(always)]
    pub fn response(&self) -> &Response {
        &self.response
    }

    #[inline(always)]
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    #[inline(always)]
    pub fn data(&self) -> &S {
        &self.data
    }

    #[inline(always)]
    pub fn data_mut(&mut self) -> &mut S {
        &mut self.data
    }

    /// Borrows the user data, the request and the response at the same time.
    ///
    /// # Examples
    /// ```
    /// use maker_adaptor::{RequestCtx, RequestHandler};
    ///
    /// struct Echo;
    ///
    /// impl RequestHandler for Echo {
    ///     async fn call(&self, ctx: &mut RequestCtx) {
    ///         let (_, req, resp) = ctx.parts_mut();
    ///         resp.body(req.body());
    ///     }
    /// }
    /// ```
    #[inline(always)]
    pub fn parts_mut(&mut self) -> (&mut S, &Request, &mut Response) {
        (&mut self.data, &self.request, &mut self.response)
    }
}

/// A low-level handler that works on the whole pooled [`RequestCtx`].
///
/// This is the calling convention used by [`ctx_handler`](crate::ctx_handler)
/// and produced by [`http_ctx_handler`](crate::http_ctx_handler). An
/// [`App`](crate::App) implements it on top of a [`Handler`](crate::Handler).
///
/// # Examples
/// ```
/// use maker_adaptor::{RequestCtx, RequestHandler, StatusCode};
///
/// struct WhoAmI;
///
/// impl RequestHandler for WhoAmI {
///     async fn call(&self, ctx: &mut RequestCtx) {
///         let addr = ctx.remote_addr();
///
///         ctx.response_mut()
///             .status(StatusCode::Ok)
///             .body_with(|w| w.write(addr.to_string()));
///     }
/// }
/// ```
pub trait RequestHandler<S = ()>
where
    Self: Sync + Send + 'static,
    S: ConnectionData,
{
    /// Processes the request stored in `ctx` and fills in its response.
    fn call(&self, ctx: &mut RequestCtx<S>) -> impl Future<Output = ()> + Send;
}

/// A trait for per-request user data stored in every pooled context.
///
/// Despite the name, the data is not tied to a connection: it is created
/// together with the context and reset each time the context returns to the
/// pool, so it lives for a single request unless `reset` keeps something.
///
/// # Examples
/// ```
/// use maker_adaptor::ConnectionData;
/// use std::collections::HashMap;
///
/// struct Scratch {
///     user_id: Option<i32>,
///     cache: HashMap<usize, [u8; 4]>,
/// }
///
/// impl ConnectionData for Scratch {
///     fn new() -> Self {
///         Self {
///             user_id: None,
///             cache: HashMap::new(),
///         }
///     }
///
///     fn reset(&mut self) {
///         self.user_id = None;
///         self.cache.clear(); // Saving the allocated memory
///     }
/// }
/// ```
pub trait ConnectionData: Sync + Send + 'static {
    /// Creates a new instance of user data.
    ///
    /// It is called once per pooled context, which avoids runtime allocations.
    fn new() -> Self;

    /// Resets the internal state of the instance to its initial values.
    ///
    /// It is called when the context returns to the pool.
    fn reset(&mut self);
}

impl ConnectionData for () {
    #[inline(always)]
    fn new() -> Self {}

    #[inline(always)]
    fn reset(&mut self) {}
}
