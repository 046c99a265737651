use crate::{
    limits::{PoolLimits, ReqLimits, RespLimits},
    ConnectionData, RequestCtx,
};
use crossbeam::queue::ArrayQueue;
use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tracing::{debug, trace};

/// A lock-free pool of reusable [`RequestCtx`] values.
///
/// ```text
///   acquire() ==> [ idle context? ] == no ==> [ allocate ]
///                        | yes                     |
///                        v                         v
///                   [ PooledCtx ] <================/
///                        |
///   drop(PooledCtx) ==> [ reset ] ==> [ idle < max_idle? ] == no ==> [ discard ]
///                                            | yes
///                                            v
///                                       [ keep idle ]
/// ```
///
/// Cloning is cheap: clones share the same free list and counters.
///
/// # Examples
/// ```
/// use maker_adaptor::{
///     limits::{PoolLimits, ReqLimits, RespLimits},
///     CtxPool,
/// };
///
/// let pool: CtxPool = CtxPool::new(
///     PoolLimits { prealloc: 2, ..PoolLimits::default() },
///     ReqLimits::default(),
///     RespLimits::default(),
/// );
/// assert_eq!(pool.idle(), 2);
///
/// {
///     let mut ctx = pool.acquire();
///     ctx.response_mut().append_body("in use");
///     assert_eq!(pool.idle(), 1);
/// } // reset and returned here
///
/// assert_eq!(pool.idle(), 2);
/// assert_eq!(pool.stats().acquired, pool.stats().released);
/// ```
pub struct CtxPool<S = ()> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    // `None` when `max_idle` is 0
    idle: Option<ArrayQueue<Box<RequestCtx<S>>>>,

    pool_limits: PoolLimits,
    req_limits: ReqLimits,
    resp_limits: RespLimits,

    acquired: AtomicUsize,
    released: AtomicUsize,
    created: AtomicUsize,
    discarded: AtomicUsize,
}

/// Counters describing the pool's activity since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Contexts handed out by [`CtxPool::acquire`].
    pub acquired: usize,
    /// Contexts given back, whatever happened to them afterwards.
    pub released: usize,
    /// Contexts allocated, including preallocated ones.
    pub created: usize,
    /// Released contexts dropped because the pool was full.
    pub discarded: usize,
}

impl PoolStats {
    /// Contexts currently lent out.
    #[inline]
    pub const fn in_use(&self) -> usize {
        self.acquired.saturating_sub(self.released)
    }
}

impl<S: ConnectionData> CtxPool<S> {
    pub fn new(pool_limits: PoolLimits, req_limits: ReqLimits, resp_limits: RespLimits) -> Self {
        let inner = Inner {
            idle: (pool_limits.max_idle > 0).then(|| ArrayQueue::new(pool_limits.max_idle)),
            pool_limits,
            req_limits,
            resp_limits,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
        };

        if let Some(idle) = &inner.idle {
            for _ in 0..inner.pool_limits.prealloc.min(idle.capacity()) {
                let _ = idle.push(inner.create());
            }
        }

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Takes an idle context or allocates a new one.
    ///
    /// The context goes back to the pool when the returned guard is dropped,
    /// including during unwinding or when the owning future is cancelled.
    pub fn acquire(&self) -> PooledCtx<S> {
        let ctx = match self.inner.idle.as_ref().and_then(ArrayQueue::pop) {
            Some(ctx) => ctx,
            None => {
                let ctx = self.inner.create();
                debug!(
                    created = self.inner.created.load(Ordering::Relaxed),
                    "request context pool grew"
                );
                ctx
            }
        };

        self.inner.acquired.fetch_add(1, Ordering::Relaxed);
        trace!(idle = self.inner.idle_len(), "request context acquired");

        PooledCtx {
            ctx: Some(ctx),
            pool: self.inner.clone(),
        }
    }

    /// Number of contexts currently waiting for reuse.
    #[inline]
    pub fn idle(&self) -> usize {
        self.inner.idle_len()
    }

    #[inline]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.inner.acquired.load(Ordering::Acquire),
            released: self.inner.released.load(Ordering::Acquire),
            created: self.inner.created.load(Ordering::Acquire),
            discarded: self.inner.discarded.load(Ordering::Acquire),
        }
    }

    #[inline]
    pub fn request_limits(&self) -> &ReqLimits {
        &self.inner.req_limits
    }

    #[inline]
    pub fn response_limits(&self) -> &RespLimits {
        &self.inner.resp_limits
    }
}

impl<S> Inner<S> {
    #[inline]
    fn idle_len(&self) -> usize {
        self.idle.as_ref().map_or(0, ArrayQueue::len)
    }
}

impl<S: ConnectionData> Inner<S> {
    #[inline]
    fn create(&self) -> Box<RequestCtx<S>> {
        self.created.fetch_add(1, Ordering::Relaxed);
        Box::new(RequestCtx::new(&self.req_limits, &self.resp_limits))
    }

    #[inline]
    fn release(&self, mut ctx: Box<RequestCtx<S>>) {
        ctx.reset(&self.req_limits, &self.resp_limits);

        let kept = match &self.idle {
            Some(idle) => idle.push(ctx).is_ok(),
            None => false,
        };
        if !kept {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(
                max_idle = self.pool_limits.max_idle,
                "request context pool full, context dropped"
            );
        }

        self.released.fetch_add(1, Ordering::Release);
        trace!(idle = self.idle_len(), "request context released");
    }
}

impl<S> Clone for CtxPool<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S> fmt::Debug for CtxPool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CtxPool")
            .field("idle", &self.inner.idle_len())
            .field("limits", &self.inner.pool_limits)
            .finish()
    }
}

/// A [`RequestCtx`] borrowed from a [`CtxPool`].
///
/// Dereferences to the context. Dropping the guard resets the context and
/// returns it to the pool exactly once.
pub struct PooledCtx<S: ConnectionData = ()> {
    ctx: Option<Box<RequestCtx<S>>>,
    pool: Arc<Inner<S>>,
}

impl<S: ConnectionData> Deref for PooledCtx<S> {
    type Target = RequestCtx<S>;

    #[inline(always)]
    fn deref(&self) -> &RequestCtx<S> {
        // Only `drop` takes the context out.
        match &self.ctx {
            Some(ctx) => &**ctx,
            None => unreachable!("pooled context used after release"),
        }
    }
}

impl<S: ConnectionData> DerefMut for PooledCtx<S> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut RequestCtx<S> {
        match &mut self.ctx {
            Some(ctx) => &mut **ctx,
            None => unreachable!("pooled context used after release"),
        }
    }
}

impl<S: ConnectionData> Drop for PooledCtx<S> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}

impl<S: ConnectionData + fmt::Debug> fmt::Debug for PooledCtx<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledCtx").field(&self.ctx).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{panic::AssertUnwindSafe, sync::Barrier};

    fn pool(max_idle: usize, prealloc: usize) -> CtxPool {
        CtxPool::new(
            PoolLimits {
                max_idle,
                prealloc,
                ..PoolLimits::default()
            },
            ReqLimits::default(),
            RespLimits::default(),
        )
    }

    #[test]
    fn prealloc_is_clamped() {
        #[rustfmt::skip]
        let cases = [
            // (max_idle, prealloc, idle)
            (4, 0, 0),
            (4, 2, 2),
            (4, 9, 4),
            (0, 3, 0),
        ];

        for (max_idle, prealloc, idle) in cases {
            let pool = pool(max_idle, prealloc);
            assert_eq!(pool.idle(), idle);
            assert_eq!(pool.stats().created, idle);
        }
    }

    #[test]
    fn reuse_and_reset() {
        let pool = pool(4, 0);

        {
            let mut ctx = pool.acquire();
            ctx.request_mut().set_body("dirty");
            ctx.response_mut().set_status_code(418);
        }
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire();
        assert!(ctx.request().body().is_empty());
        assert_eq!(ctx.response().status_code(), 200);
        drop(ctx);

        let stats = pool.stats();
        assert_eq!(
            stats,
            PoolStats {
                acquired: 2,
                released: 2,
                created: 1,
                discarded: 0,
            }
        );
        assert_eq!(stats.in_use(), 0);
    }

    #[test]
    fn surplus_is_discarded() {
        let pool = pool(1, 0);

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        assert_eq!(pool.stats().in_use(), 3);

        drop((a, b, c));

        let stats = pool.stats();
        assert_eq!(pool.idle(), 1);
        assert_eq!((stats.created, stats.discarded), (3, 2));
        assert_eq!(stats.acquired, stats.released);
    }

    #[test]
    fn idle_bound_under_concurrent_release() {
        let pool = pool(1, 0);

        for _ in 0..100 {
            let contexts: Vec<_> = (0..8).map(|_| pool.acquire()).collect();
            let barrier = Barrier::new(contexts.len());

            std::thread::scope(|scope| {
                for ctx in contexts {
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        drop(ctx);
                    });
                }
            });

            assert_eq!(pool.idle(), 1);
        }

        let stats = pool.stats();
        assert_eq!(stats.acquired, stats.released);
        assert_eq!(stats.created, stats.discarded + 1);
    }

    #[test]
    fn released_on_panic() {
        let pool = pool(4, 0);
        let shared = pool.clone();

        let result = std::panic::catch_unwind(AssertUnwindSafe(move || {
            let _ctx = shared.acquire();
            panic!("handler failed");
        }));

        assert!(result.is_err());
        assert_eq!(pool.stats().in_use(), 0);
        assert_eq!(pool.idle(), 1);
    }
}
