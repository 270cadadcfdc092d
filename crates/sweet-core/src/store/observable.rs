// ── Generic observable value cell ──
//
// Current value plus an ordered list of synchronous subscribers. The value
// is mirrored into a `watch` channel so async consumers can await changes
// without registering callbacks.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::stream::CellStream;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscribers<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// A single reactive value with replay-latest, multicast notification.
///
/// `set` overwrites the value and invokes every subscriber synchronously,
/// in subscription order, on the calling thread. Callers are expected to
/// mutate cells only from the session's main context.
pub struct Observable<T: Clone + Send + Sync + 'static> {
    value: watch::Sender<T>,
    subscribers: Arc<Mutex<Subscribers<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            value,
            subscribers: Arc::new(Mutex::new(Subscribers {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Current value (cloned).
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Overwrite the value and notify all subscribers, even if unchanged.
    pub fn set(&self, value: T) {
        self.value.send_replace(value.clone());
        self.notify(&value);
    }

    /// Overwrite and notify only when the value differs from the current one.
    /// Returns `true` if subscribers were notified.
    pub fn set_distinct(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        let unchanged = *self.value.borrow() == value;
        if unchanged {
            return false;
        }
        self.set(value);
        true
    }

    /// Register a callback that immediately receives the current value,
    /// then every subsequent one.
    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let current = self.get();
        f(&current);
        self.register(Arc::new(f))
    }

    /// Register a callback for subsequent values only (no replay).
    pub fn observe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.register(Arc::new(f))
    }

    /// Async view of the cell via a `watch::Receiver`.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }

    /// Subscription handle with snapshot + change-await access.
    pub fn stream(&self) -> CellStream<T> {
        CellStream::new(self.value.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().entries.len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn register(&self, callback: Callback<T>) -> Subscription {
        let id = {
            let mut subs = self.subscribers.lock();
            let id = subs.next_id;
            subs.next_id += 1;
            subs.entries.push((id, callback));
            id
        };

        let weak: Weak<Mutex<Subscribers<T>>> = Arc::downgrade(&self.subscribers);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(subs) = weak.upgrade() {
                    subs.lock().entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Invoke callbacks outside the lock so they may touch other cells
    /// (or this one) re-entrantly.
    fn notify(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self
            .subscribers
            .lock()
            .entries
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(value);
        }
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Keeps a callback registered until dropped.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Keep the callback registered for the lifetime of the cell.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v: &T| sink.lock().push(v.clone()))
    }

    #[test]
    fn subscribe_replays_current_value_first() {
        let cell = Observable::new(7);
        let (seen, f) = recorder::<i32>();
        let _sub = cell.subscribe(f);

        cell.set(8);
        assert_eq!(*seen.lock(), vec![7, 8]);
    }

    #[test]
    fn observe_skips_replay() {
        let cell = Observable::new("a".to_string());
        let (seen, f) = recorder::<String>();
        let _sub = cell.observe(f);

        cell.set("b".into());
        assert_eq!(*seen.lock(), vec!["b".to_string()]);
    }

    #[test]
    fn set_notifies_even_when_unchanged() {
        let cell = Observable::new(false);
        let (seen, f) = recorder::<bool>();
        let _sub = cell.observe(f);

        cell.set(false);
        cell.set(false);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn set_distinct_suppresses_duplicates() {
        let cell = Observable::new(1);
        let (seen, f) = recorder::<i32>();
        let _sub = cell.observe(f);

        assert!(!cell.set_distinct(1));
        assert!(cell.set_distinct(2));
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn subscribers_run_in_subscription_order() {
        let cell = Observable::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&order);
        let _a = cell.observe(move |_| first.lock().push("first"));
        let second = Arc::clone(&order);
        let _b = cell.observe(move |_| second.lock().push("second"));

        cell.set(1);
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let cell = Observable::new(0);
        let (seen, f) = recorder::<i32>();
        let sub = cell.observe(f);
        assert_eq!(cell.subscriber_count(), 1);

        drop(sub);
        cell.set(5);
        assert_eq!(cell.subscriber_count(), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn detached_subscription_stays_registered() {
        let cell = Observable::new(0);
        let (seen, f) = recorder::<i32>();
        cell.observe(f).detach();

        cell.set(3);
        assert_eq!(*seen.lock(), vec![3]);
    }

    #[test]
    fn watch_receiver_sees_latest_value() {
        let cell = Observable::new(1);
        let rx = cell.watch();
        cell.set(2);
        assert_eq!(*rx.borrow(), 2);
        assert_eq!(cell.get(), 2);
    }
}
