use tokio::sync::broadcast;

// NOTE: subscribers are expected to keep up with slot cadence; this bound only protects against
// a slow consumer stalling the publisher. A lagging subscriber drops the oldest events rather
// than blocking the producer, per the event fan-out policy.
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Thin wrapper over a broadcast sender that fans events out to any number of subscribers,
/// dropping the oldest buffered event for a subscriber that falls behind instead of blocking
/// the publisher or the other subscribers.
#[derive(Clone)]
pub struct Publisher<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> Publisher<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription { receiver: self.sender.subscribe() }
    }

    /// Publish to all current subscribers. Returns the number that received it; `0` just means
    /// nobody is currently listening, not an error.
    pub fn publish(&self, event: T) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Subscription<T> {
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Await the next event. On lag, skips forward to the oldest event still buffered rather
    /// than returning an error to the caller, since a missed head event is recoverable by
    /// re-deriving state from the next one.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drop this subscription's place in line. A plain `drop` does the same thing; this exists
    /// so callers can unsubscribe explicitly without relying on scope exit.
    pub fn unsubscribe(self) {
        drop(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let publisher = Publisher::new();
        let mut sub = publisher.subscribe();
        publisher.publish(42u64);
        assert_eq!(sub.recv().await, Some(42));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_to_oldest_buffered() {
        let publisher = Publisher::with_capacity(2);
        let mut sub = publisher.subscribe();
        for i in 0..5u64 {
            publisher.publish(i);
        }
        // the receiver lagged and should recover rather than error out
        let next = sub.recv().await;
        assert!(next.is_some());
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_is_not_an_error() {
        let publisher: Publisher<u64> = Publisher::new();
        assert_eq!(publisher.publish(1), 0);
    }

    #[tokio::test]
    async fn test_closed_publisher_ends_subscription() {
        let publisher = Publisher::new();
        let mut sub = publisher.subscribe();
        drop(publisher);
        assert_eq!(sub.recv().await, None);
    }
}
