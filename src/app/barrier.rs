//! One-shot completion barrier
//!
//! A [`CompletionBarrier`] is created with the number of events to await.
//! Each event calls [`CompletionBarrier::count_down`]; waiters are released
//! when the count reaches zero and every later waiter returns immediately.
//! The count never goes up again, so a barrier is used for one join only.
//!
//! Counting down an already released barrier is a usage error. It is
//! clamped at zero and logged rather than panicking, because the extra
//! signal usually comes from a completion callback on another task where a
//! panic would be lost.

use tokio::sync::watch;
use tracing::warn;

/// Waits until a fixed number of events have been signalled
#[derive(Debug)]
pub struct CompletionBarrier {
    remaining: watch::Sender<usize>,
    initial: usize,
}

impl CompletionBarrier {
    /// Creates a barrier that releases after `count` calls to `count_down`
    ///
    /// A barrier created with zero is released from the start.
    pub fn new(count: usize) -> Self {
        let (remaining, _) = watch::channel(count);
        Self {
            remaining,
            initial: count,
        }
    }

    /// Records one event
    ///
    /// Safe to call concurrently from any number of tasks. Returns `false`
    /// if the barrier had already been released.
    pub fn count_down(&self) -> bool {
        let decremented = self.remaining.send_if_modified(|remaining| {
            if *remaining == 0 {
                false
            } else {
                *remaining -= 1;
                true
            }
        });

        if !decremented {
            warn!(
                "count_down called on a released barrier (initial count {})",
                self.initial
            );
        }
        decremented
    }

    /// Waits until the count reaches zero
    ///
    /// Returns immediately if the barrier is already released.
    pub async fn wait(&self) {
        let mut receiver = self.remaining.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = receiver.wait_for(|remaining| *remaining == 0).await;
    }

    /// Events still outstanding
    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    /// Whether the barrier has been released
    pub fn is_released(&self) -> bool {
        self.remaining() == 0
    }

    /// Count the barrier was created with
    pub fn initial(&self) -> usize {
        self.initial
    }
}
