//! Context pool configuration and buffer limits
//!
//! # Memory Consumption
//!
//! Every pooled context keeps its buffers between requests:
//!
//! `Total` = [`Request Buffer`](crate::limits::ReqLimits#memory-allocation-strategy) +
//!           [`Response Buffer`](crate::limits::RespLimits#buffer-management) +
//!           `User Data`
//!
//! and the pool keeps at most [`max_idle`](PoolLimits::max_idle) idle contexts.
//!
//! # Examples
//!
//! ```
//! use maker_adaptor::{
//!     limits::{PoolLimits, ReqLimits, RespLimits},
//!     App, Handled, Handler, Request, Response, StatusCode,
//! };
//!
//! struct MyHandler;
//!
//! impl Handler for MyHandler {
//!     async fn handle(&self, _: &mut (), _: &Request, resp: &mut Response) -> Handled {
//!         resp.status(StatusCode::Ok).body("Hello world!")
//!     }
//! }
//!
//! let app = App::builder()
//!     .handler(MyHandler)
//!     .pool_limits(PoolLimits {
//!         max_idle: 1024, // More concurrent requests kept warm
//!         prealloc: 64,
//!         ..PoolLimits::default()
//!     })
//!     .request_limits(ReqLimits {
//!         body_size: 16 * 1024,               // 16KB initial body buffer
//!         max_body_size: Some(1024 * 1024),   // Reject bodies over 1MB
//!         ..ReqLimits::default()
//!     })
//!     .response_limits(RespLimits::default())
//!     .build();
//!
//! assert_eq!(app.pool().idle(), 64);
//! ```

use std::mem::size_of;

/// Controls how many request contexts are kept for reuse.
///
/// ```text
///   [ acquire ] ==> /-------------\  Yes  [ take idle context ]
///                   | Pool empty? | ====> [ allocate new one  ]
///                   \-------------/  No
///
///   [ release ] ==> [ reset ] ==> /-------------------\  Yes  [ drop context ]
///                                 | max_idle reached? | ====> [ keep idle    ]
///                                 \-------------------/  No
/// ```
#[derive(Debug, Clone)]
pub struct PoolLimits {
    /// Maximum number of idle contexts kept in the pool (default: `256`).
    ///
    /// Contexts released while the pool already holds this many are dropped.
    /// A value of `0` disables reuse entirely. Room for this many slots is
    /// allocated when the pool is created.
    pub max_idle: usize,

    /// Number of contexts allocated when the pool is created (default: `0`).
    ///
    /// Values above [`max_idle`](Self::max_idle) are clamped.
    pub prealloc: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_idle: 256,
            prealloc: 0,

            _priv: (),
        }
    }
}

/// Request buffer pre-allocation and body limits.
///
/// # Memory Allocation Strategy
///
/// Each context allocates its request buffers once, based on these values:
///
/// | Component | Field | Default | Purpose |
/// |-----------|-------|---------|---------|
/// | URI | `url_size` | 256 B | Request target with query |
/// | Header arena | `header_bytes` | 2,048 B | Header names and values |
/// | Header entries | `header_count` | 16 | Offsets into the arena |
/// | Body | `body_size` | 4,096 B | Request payload |
///
/// Buffers that grow past [`max_capacity`](Self::max_capacity) while serving a
/// large request are reallocated at their initial size when the context returns
/// to the pool, the rest are only cleared.
///
/// # Example
/// ```
/// use maker_adaptor::limits::ReqLimits;
///
/// let limits = ReqLimits::default();
/// println!("Each context needs {} bytes for request data", limits.estimated_buffer_size());
/// ```
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Initial capacity of the request URI buffer (default: `256 B`)
    pub url_size: usize,
    /// Initial number of header entries (default: `16 headers`)
    pub header_count: usize,
    /// Initial capacity of the header arena (default: `2 KB`)
    pub header_bytes: usize,
    /// Initial capacity of the body buffer (default: `4 KB`)
    pub body_size: usize,
    /// Largest buffer capacity kept between requests (default: `64 KB`)
    pub max_capacity: usize,

    /// Maximum number of body bytes read from a standard request (default: `None`)
    ///
    /// `None` reads the whole body whatever its size. A body exceeding the
    /// limit is a body read failure and answered with `500 Internal Server Error`.
    pub max_body_size: Option<usize>,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self {
            url_size: 256,        // Enough for: /api/v1/users/search?q=test&page=1
            header_count: 16,     // Typical: 10-12 browser headers + 4-6 custom
            header_bytes: 2048,   // Fits most tokens and cookies
            body_size: 4 * 1024,  // Good for JSON API requests
            max_capacity: 64 * 1024,
            max_body_size: None,

            _priv: (),
        }
    }
}

impl ReqLimits {
    /// Returns the estimated request buffer size held by one context.
    ///
    /// The parser-free model only stores raw bytes, so this is the sum of the
    /// initial buffer capacities plus the header entry table.
    #[inline]
    pub fn estimated_buffer_size(&self) -> usize {
        self.url_size
            + self.header_bytes
            + self.header_count * size_of::<[usize; 4]>()
            + self.body_size
    }
}

/// Configuration for response buffers.
///
/// # Buffer Management
///
/// Based on the configured limits, response buffers are managed as follows:
/// ```rust
/// # use maker_adaptor::limits::RespLimits;
/// # let limits = RespLimits::default();
/// # let mut buffer: Vec<()> = Vec::with_capacity(limits.default_capacity);
/// #
/// // `buffer` is Vec
/// if buffer.capacity() > limits.max_capacity {
///     buffer = Vec::with_capacity(limits.default_capacity);
/// } else {
///     buffer.clear();
/// }
/// ```
///
/// When the pool creates a context, buffers are created with a capacity equal
/// to `default_capacity`.
#[derive(Debug, Clone)]
pub struct RespLimits {
    /// Initial body buffer capacity (default: `1024 B`)
    pub default_capacity: usize,
    /// Maximum body buffer capacity kept between requests (default: `8192 B`)
    pub max_capacity: usize,
    /// Initial number of header entries (default: `8`)
    pub header_count: usize,
    /// Initial capacity of the header arena (default: `512 B`)
    pub header_bytes: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for RespLimits {
    fn default() -> Self {
        Self {
            default_capacity: 1024,
            max_capacity: 8 * 1024,
            header_count: 8,
            header_bytes: 512,

            _priv: (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_buffer_size() {
        let limits = ReqLimits::default();
        let entries = 16 * size_of::<[usize; 4]>();

        assert_eq!(
            limits.estimated_buffer_size(),
            256 + 2048 + entries + 4 * 1024
        );

        let limits = ReqLimits {
            url_size: 0,
            header_count: 0,
            header_bytes: 0,
            body_size: 10,
            ..ReqLimits::default()
        };
        assert_eq!(limits.estimated_buffer_size(), 10);
    }

    #[test]
    fn defaults() {
        let pool = PoolLimits::default();
        assert_eq!((pool.max_idle, pool.prealloc), (256, 0));

        let resp = RespLimits::default();
        assert!(resp.default_capacity <= resp.max_capacity);

        let req = ReqLimits::default();
        assert!(req.body_size <= req.max_capacity);
        assert_eq!(req.max_body_size, None);
    }
}
