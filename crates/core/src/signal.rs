//! Signal: explicit observable cell
//!
//! The data layer requires field mutations (operation status/result/error,
//! record errors) to be observable by an upper layer without binding to any
//! specific UI mechanism. `Signal<T>` is that seam: a value behind a lock
//! plus a subscriber table, notified on every mutation.
//!
//! ## Notification discipline
//!
//! Subscribers run synchronously on the mutating thread, *after* the value
//! write lock is released (a subscriber may read the signal again).
//! Callbacks must not themselves mutate the same signal; that is a
//! re-entrancy bug in the subscriber, not something this cell defends
//! against.
//!
//! ## Thread safety
//!
//! `Signal<T>` is `Send + Sync` for `T: Send + Sync` and can sit inside
//! `Arc`-shared state.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle identifying one subscriber, for unsubscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Subscriber<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Observable cell: a value plus subscribe/notify
pub struct Signal<T> {
    value: RwLock<T>,
    subscribers: RwLock<Vec<(SubscriberId, Subscriber<T>)>>,
    next_id: AtomicU64,
}

impl<T> Signal<T> {
    /// Create a signal holding `value`
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Read the current value through a closure (no clone)
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: T) {
        {
            let mut guard = self.value.write();
            *guard = value;
        }
        self.notify();
    }

    /// Mutate the value in place and notify subscribers
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut guard = self.value.write();
            f(&mut guard);
        }
        self.notify();
    }

    /// Register a subscriber; it fires on every subsequent mutation
    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Box::new(f)));
        id
    }

    /// Remove a subscriber; unknown ids are ignored
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|(sid, _)| *sid != id);
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn notify(&self) {
        let value = self.value.read();
        for (_, subscriber) in self.subscribers.read().iter() {
            subscriber(&value);
        }
    }
}

impl<T: Clone> Signal<T> {
    /// Clone out the current value
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T: Default> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.value.read())
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_get_set() {
        let signal = Signal::new(1);
        assert_eq!(signal.get(), 1);
        signal.set(2);
        assert_eq!(signal.get(), 2);
    }

    #[test]
    fn test_with_reads_without_clone() {
        let signal = Signal::new("abc".to_string());
        let len = signal.with(|s| s.len());
        assert_eq!(len, 3);
    }

    #[test]
    fn test_update_in_place() {
        let signal = Signal::new(vec![1, 2]);
        signal.update(|v| v.push(3));
        assert_eq!(signal.get(), vec![1, 2, 3]);
    }

    #[test]
    fn test_subscribe_fires_on_set() {
        let signal = Signal::new(0);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in = seen.clone();
        signal.subscribe(move |v| {
            seen_in.store(*v as usize, Ordering::SeqCst);
        });

        signal.set(41);
        assert_eq!(seen.load(Ordering::SeqCst), 41);
        signal.update(|v| *v += 1);
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let signal = Signal::new(0);
        let count = Arc::new(AtomicUsize::new(0));
        let count_in = count.clone();
        let id = signal.subscribe(move |_| {
            count_in.fetch_add(1, Ordering::SeqCst);
        });

        signal.set(1);
        signal.unsubscribe(id);
        signal.set(2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_may_read_signal() {
        let signal = Arc::new(Signal::new(0));
        let observed = Arc::new(AtomicUsize::new(0));
        let signal_in = signal.clone();
        let observed_in = observed.clone();
        signal.subscribe(move |_| {
            // The value lock is released before notification
            observed_in.store(signal_in.get() as usize, Ordering::SeqCst);
        });

        signal.set(9);
        assert_eq!(observed.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn test_signal_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Signal<i64>>();
    }
}
