//! The terminal seam of the publish chain.

use crate::context::PublishContext;
use crate::filter::PublishFuture;

/// The terminal action of a publish chain: the link that actually hands the
/// event to the outside world.
///
/// A transport runs at most once per top-level publish call, and only after
/// every filter has forwarded (once per forwarding when a retrying filter is
/// present). It sees the cumulative header mutations of all filters and is
/// expected to observe the context's cancellation token around slow I/O.
///
/// Implementations live outside the core crate:
/// [`RedpandaTransport`](../../eventline_redpanda/struct.RedpandaTransport.html)
/// for production brokers,
/// [`RecordingTransport`](../../eventline_testing/mocks/struct.RecordingTransport.html)
/// for tests.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; overlapping publish calls share
/// the transport instance.
pub trait PublishTransport: Send + Sync {
    /// Deliver the event in `ctx` to its destination.
    ///
    /// Returns `Ok(PublishOutcome::Delivered)` on success. Delivery failures
    /// surface as
    /// [`PublishError::DeliveryFailed`](crate::publisher::PublishError::DeliveryFailed)
    /// and propagate unwrapped to the original caller unless an intervening
    /// filter catches them.
    fn deliver<'a>(&'a self, ctx: &'a mut PublishContext) -> PublishFuture<'a>;
}
