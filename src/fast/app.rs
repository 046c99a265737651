use crate::{
    limits::{PoolLimits, ReqLimits, RespLimits},
    ConnectionData, CtxPool, Handled, PooledCtx, Request, RequestCtx, RequestHandler, Response,
};
use std::{future::Future, marker::PhantomData};

/// A trait for handling HTTP requests and generating responses.
///
/// You can use:
/// - `&self` for shared immutable data (e.g. database connection pool, router configuration)
/// - `&mut S` for per-context scratch state (see [`ConnectionData`])
///
/// # Examples
///
/// Basic Request Handler
/// ```
/// use maker_adaptor::{Handler, Request, Response, Handled, StatusCode};
///
/// struct MyHandler;
///
/// impl Handler for MyHandler {
///     async fn handle(&self, _: &mut (), req: &Request, resp: &mut Response) -> Handled {
///         // Simple echo handler
///         if req.path() == b"/echo" {
///             resp.status(StatusCode::Ok).body(req.body())
///         } else {
///             resp.status(StatusCode::NotFound).body("Not found :(")
///         }
///     }
/// }
/// ```
/// Handler with [`ConnectionData`]
/// ```
/// use maker_adaptor::{Handler, ConnectionData, Request, Response, Handled, StatusCode};
///
/// struct Tokenizer;
///
/// impl Handler<Words> for Tokenizer {
///     async fn handle(&self, words: &mut Words, req: &Request, resp: &mut Response) -> Handled {
///         let text = std::str::from_utf8(req.body()).unwrap_or_default();
///         words.0.extend(text.split_whitespace().map(str::len));
///
///         resp.status(StatusCode::Ok)
///             .body(format!("{:?}", words.0))
///     }
/// }
///
/// struct Words(Vec<usize>);
///
/// impl ConnectionData for Words {
///     fn new() -> Self {
///         Self(Vec::with_capacity(64))
///     }
///
///     fn reset(&mut self) {
///         self.0.clear();
///     }
/// }
/// ```
pub trait Handler<S = ()>
where
    Self: Sync + Send + 'static,
    S: ConnectionData,
{
    /// Processes an HTTP request and generates a response.
    ///
    /// # Parameters
    ///
    /// - `data`: Mutable reference to the context's user data
    /// - `request`: Immutable reference to the translated request
    /// - `response`: Mutable response builder for constructing the response
    ///
    /// # Errors
    ///
    /// Implementations should handle errors internally and set appropriate
    /// HTTP status codes on the response. A panic unwinds through the
    /// adaptor; the pooled context is still returned.
    fn handle(
        &self,
        data: &mut S,
        request: &Request,
        response: &mut Response,
    ) -> impl Future<Output = Handled> + Send;
}

/// A fast-model application: a [`Handler`] together with the context pool
/// and limits it runs with.
///
/// `App` implements [`RequestHandler`], so it can be served through
/// [`fast_app`](crate::fast_app) or driven directly.
///
/// # Examples
///
/// ```
/// # maker_adaptor::impt_default_handler!{ MyHandler }
/// use maker_adaptor::{App, RequestHandler};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let app = App::new(MyHandler);
///
/// let mut ctx = app.acquire();
/// app.call(&mut ctx).await;
/// assert_eq!(ctx.response().body_bytes(), b"Hello world!");
/// # }
/// ```
pub struct App<H, S = ()>
where
    H: Handler<S>,
    S: ConnectionData,
{
    handler: H,
    pool: CtxPool<S>,
}

impl<H, S> App<H, S>
where
    H: Handler<S>,
    S: ConnectionData,
{
    /// Creates an app with default limits.
    #[inline]
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            pool: CtxPool::new(
                PoolLimits::default(),
                ReqLimits::default(),
                RespLimits::default(),
            ),
        }
    }

    /// Creates a new builder for configuring the app.
    ///
    /// # Examples
    ///
    /// ```
    /// # maker_adaptor::impt_default_handler!{ MyStruct }
    /// use maker_adaptor::{App, limits::PoolLimits};
    ///
    /// let app = App::builder()
    ///     .handler(MyStruct) // structure with Handler implementation
    ///     .pool_limits(PoolLimits {
    ///         // Your changes
    ///         max_idle: 32,
    ///         ..PoolLimits::default() // Required line
    ///     })
    ///     .build();
    /// ```
    #[inline]
    pub fn builder() -> AppBuilder<H, S> {
        AppBuilder {
            handler: None,
            _marker: PhantomData,

            pool_limits: None,
            request_limits: None,
            response_limits: None,
        }
    }

    #[inline(always)]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    #[inline(always)]
    pub fn pool(&self) -> &CtxPool<S> {
        &self.pool
    }

    /// Takes a context from the app's pool.
    #[inline]
    pub fn acquire(&self) -> PooledCtx<S> {
        self.pool.acquire()
    }
}

impl<H, S> RequestHandler<S> for App<H, S>
where
    H: Handler<S>,
    S: ConnectionData,
{
    #[inline]
    async fn call(&self, ctx: &mut RequestCtx<S>) {
        let (data, request, response) = ctx.parts_mut();
        self.handler.handle(data, request, response).await;
    }
}

/// Builder for configuring and creating [`App`] instances.
pub struct AppBuilder<H, S = ()>
where
    H: Handler<S>,
    S: ConnectionData,
{
    handler: Option<H>,
    _marker: PhantomData<fn() -> S>,

    pool_limits: Option<PoolLimits>,
    request_limits: Option<ReqLimits>,
    response_limits: Option<RespLimits>,
}

impl<H, S> AppBuilder<H, S>
where
    H: Handler<S>,
    S: ConnectionData,
{
    /// Sets the handler that will process incoming requests.
    ///
    /// **This is a required component.**
    #[inline(always)]
    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Configures how many contexts are kept and preallocated.
    #[inline(always)]
    pub fn pool_limits(mut self, limits: PoolLimits) -> Self {
        self.pool_limits = Some(limits);
        self
    }

    /// Configures request buffer sizes and the body read limit.
    ///
    /// # Examples
    ///
    /// ```
    /// # maker_adaptor::impt_default_handler!{ MyStruct }
    /// use maker_adaptor::{App, limits::ReqLimits};
    ///
    /// let app = App::builder()
    ///     .handler(MyStruct) // structure with Handler implementation
    ///     .request_limits(ReqLimits {
    ///         // Your changes
    ///         url_size: 1024,
    ///         max_body_size: Some(64 * 1024),
    ///         ..ReqLimits::default() // Required line
    ///     })
    ///     .build();
    /// ```
    #[inline(always)]
    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = Some(limits);
        self
    }

    /// Configures response buffer sizes.
    #[inline(always)]
    pub fn response_limits(mut self, limits: RespLimits) -> Self {
        self.response_limits = Some(limits);
        self
    }

    /// Finalizes the builder and constructs an [`App`] instance.
    ///
    /// # Panics
    ///
    /// Error message: ``The `handler` method must be called to create``
    ///
    /// Panics when the `handler` method was not called.
    #[inline]
    #[track_caller]
    pub fn build(self) -> App<H, S> {
        App {
            handler: self
                .handler
                .expect("The `handler` method must be called to create"),
            pool: CtxPool::new(
                self.pool_limits.unwrap_or_default(),
                self.request_limits.unwrap_or_default(),
                self.response_limits.unwrap_or_default(),
            ),
        }
    }
}
