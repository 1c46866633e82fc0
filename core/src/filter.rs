//! The filter contract for intercepting publish calls.
//!
//! A filter sits between the caller and the terminal transport. It may
//! inspect the context, rewrite headers, and then either forward to the rest
//! of the chain via [`Next::run`], return its own outcome without forwarding
//! (a short-circuit), or fail. A filter that wants to translate or retry a
//! downstream fault guards its `next.run(..)` call and decides what to do
//! with the error.
//!
//! # Writing a filter
//!
//! ```
//! use eventline_core::context::PublishContext;
//! use eventline_core::filter::{Next, PublishFilter, PublishFuture};
//!
//! struct Passthrough;
//!
//! impl PublishFilter for Passthrough {
//!     fn name(&self) -> &'static str {
//!         "passthrough"
//!     }
//!
//!     fn on_publish<'a>(
//!         &'a self,
//!         ctx: &'a mut PublishContext,
//!         next: Next,
//!     ) -> PublishFuture<'a> {
//!         Box::pin(async move { next.run(ctx).await })
//!     }
//! }
//! ```
//!
//! # Dyn Compatibility
//!
//! The trait returns an explicit `Pin<Box<dyn Future>>` instead of using
//! `async fn`, so filters can be held as `Arc<dyn PublishFilter>` in the
//! composed chain.

use crate::context::PublishContext;
use crate::publisher::PublishResult;
use crate::transport::PublishTransport;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by every link of the chain.
pub type PublishFuture<'a> = Pin<Box<dyn Future<Output = PublishResult> + Send + 'a>>;

/// An interceptor in the publish chain.
///
/// Filters hold no per-call state of their own; anything they need to
/// communicate downstream goes through the context's headers. A filter must
/// be safe under concurrent execution, since overlapping publish calls run
/// through the same filter instances.
pub trait PublishFilter: Send + Sync {
    /// A short, stable name for this filter, used in outcomes, rejections,
    /// and logs.
    fn name(&self) -> &'static str;

    /// Intercept one publish call.
    ///
    /// Invoke `next.run(ctx)` to forward; returning without doing so ends
    /// the traversal with this filter's result. `next` may be re-invoked for
    /// bounded retry, in which case the terminal transport may run once per
    /// attempt but never more than once per forwarding.
    fn on_publish<'a>(&'a self, ctx: &'a mut PublishContext, next: Next) -> PublishFuture<'a>;
}

/// One node of the composed chain.
///
/// Built once at publisher construction by folding the filter sequence in
/// reverse over the terminal transport, and never mutated afterwards.
pub(crate) enum Link {
    /// A filter wrapping the rest of the chain.
    Filter {
        filter: Arc<dyn PublishFilter>,
        next: Arc<Link>,
    },
    /// The terminal transport. Always the innermost link.
    Terminal(Arc<dyn PublishTransport>),
}

impl Link {
    /// Drive this link, and through it the rest of the chain.
    pub(crate) async fn invoke(&self, ctx: &mut PublishContext) -> PublishResult {
        match self {
            Link::Filter { filter, next } => {
                let next = Next {
                    link: Arc::clone(next),
                };
                filter.on_publish(ctx, next).await
            }
            Link::Terminal(transport) => transport.deliver(ctx).await,
        }
    }
}

/// Opaque handle to the remainder of the chain.
///
/// Passed to each filter so it can forward the call. Cloning is cheap; the
/// handle only references the prebuilt chain and carries no per-call state.
#[derive(Clone)]
pub struct Next {
    pub(crate) link: Arc<Link>,
}

impl Next {
    /// Run the rest of the chain against the given context.
    pub fn run<'a>(&self, ctx: &'a mut PublishContext) -> PublishFuture<'a> {
        let link = Arc::clone(&self.link);
        Box::pin(async move { link.invoke(ctx).await })
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next")
    }
}
