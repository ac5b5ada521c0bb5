//! Latest-value join operator.
//!
//! Pairs each element of a primary stream with the most recently observed
//! element of an infallible secondary stream. This is the building block
//! that lets a command stream observe the loop's own evolving state without
//! carrying state itself.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

/// Join `primary` with the latest value of `secondary`.
///
/// - No pair is emitted until `secondary` has emitted at least once;
///   primary elements arriving earlier are dropped silently.
/// - The secondary is drained before the primary is polled, so a secondary
///   value published before a primary element is always visible to it.
/// - If `secondary` completes, the last observed value stays in use.
/// - Completion of `primary` completes the joined stream.
/// - Dropping the joined stream releases both underlying subscriptions
///   together.
pub fn with_latest_from<P, S>(primary: P, secondary: S) -> WithLatestFrom<P, S>
where
    P: Stream + Unpin,
    S: Stream + Unpin,
    S::Item: Clone,
{
    WithLatestFrom {
        primary,
        secondary: Some(secondary),
        latest: None,
    }
}

/// Extension adapter form of [`with_latest_from`].
pub trait WithLatestExt: Stream + Unpin + Sized {
    /// See [`with_latest_from`].
    fn with_latest_from<S>(self, secondary: S) -> WithLatestFrom<Self, S>
    where
        S: Stream + Unpin,
        S::Item: Clone,
    {
        with_latest_from(self, secondary)
    }
}

impl<P: Stream + Unpin + Sized> WithLatestExt for P {}

/// Stream returned by [`with_latest_from`]. Owns both subscriptions.
#[must_use = "streams do nothing unless polled"]
pub struct WithLatestFrom<P, S: Stream> {
    primary: P,
    secondary: Option<S>,
    latest: Option<S::Item>,
}

// The stored `latest: Option<S::Item>` is never structurally pinned - it is
// only read and overwritten by value. `poll_next` re-pins the `Unpin` inner
// streams individually, so the combinator is safe to move while pinned
// regardless of whether `S::Item` is `Unpin`.
impl<P, S: Stream> Unpin for WithLatestFrom<P, S> {}

impl<P, S> Stream for WithLatestFrom<P, S>
where
    P: Stream + Unpin,
    S: Stream + Unpin,
    S::Item: Clone,
{
    type Item = (P::Item, S::Item);

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // Drain the secondary so every value emitted before the next primary
        // element is visible to it. A completed secondary keeps its last
        // value live.
        let mut secondary_done = false;
        if let Some(secondary) = this.secondary.as_mut() {
            loop {
                match Pin::new(&mut *secondary).poll_next(cx) {
                    Poll::Ready(Some(value)) => this.latest = Some(value),
                    Poll::Ready(None) => {
                        secondary_done = true;
                        break;
                    }
                    Poll::Pending => break,
                }
            }
        }
        if secondary_done {
            this.secondary = None;
        }

        loop {
            match Pin::new(&mut this.primary).poll_next(cx) {
                Poll::Ready(Some(element)) => {
                    if let Some(latest) = this.latest.clone() {
                        return Poll::Ready(Some((element, latest)));
                    }
                    // No secondary value yet: drop the element and keep going.
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
