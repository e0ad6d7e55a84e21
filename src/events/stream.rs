//! # Multi-subscriber broadcast stream.
//!
//! [`EventStream`] is the only notification primitive used by the hub: a mutex-guarded list
//! of observers plus subscription tokens.
//!
//! ## Architecture
//! ```text
//! publish(value)
//!   ├─► lock ─► copy observer list ─► unlock
//!   └─► for each observer (no lock held):
//!          catch_unwind(on_event(&value))
//!            └─ panic → logged, delivery continues
//! ```
//!
//! ## Rules
//! - **Point-in-time delivery**: observers added or removed during a publish do not change
//!   who receives that value.
//! - **Reentrancy**: an observer may subscribe, unsubscribe (itself or others) or publish
//!   from inside `on_event`.
//! - **Isolation**: one panicking observer never starves the others.
//! - **Disposal**: `subscribe` on a disposed stream fails with [`HubError::Disposed`];
//!   `publish` becomes a no-op.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::error;

use crate::error::{panic_message, HubError};
use crate::events::subscriber::{FnSubscriber, Subscribe};
use crate::events::subscription::{Detach, Subscription};

struct Entry<T> {
    id: u64,
    observer: Arc<dyn Subscribe<T>>,
}

struct StreamState<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
    disposed: bool,
}

struct StreamInner<T> {
    name: &'static str,
    state: Mutex<StreamState<T>>,
}

impl<T> StreamInner<T> {
    fn lock(&self) -> MutexGuard<'_, StreamState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: 'static> Detach for StreamInner<T> {
    fn detach(&self, id: u64) {
        self.lock().entries.retain(|e| e.id != id);
    }
}

/// Thread-safe broadcast of `T` values to any number of observers.
///
/// Cheap to clone; clones share the same observer list.
pub struct EventStream<T> {
    inner: Arc<StreamInner<T>>,
}

impl<T: 'static> EventStream<T> {
    /// Creates a stream. `name` shows up in logs and [`HubError::Disposed`].
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                name,
                state: Mutex::new(StreamState {
                    next_id: 0,
                    entries: Vec::new(),
                    disposed: false,
                }),
            }),
        }
    }

    /// Registers a closure handler.
    ///
    /// ## Example
    /// ```rust
    /// use opshub::EventStream;
    ///
    /// let stream = EventStream::<u32>::new("numbers");
    /// let sub = stream.subscribe(|n| println!("got {n}")).unwrap();
    /// stream.publish(7);
    /// sub.unsubscribe();
    /// assert_eq!(stream.subscriber_count(), 0);
    /// ```
    pub fn subscribe<F>(&self, handler: F) -> Result<Subscription, HubError>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_observer(Arc::new(FnSubscriber::new(handler)))
    }

    /// Registers a named observer.
    pub fn subscribe_observer(
        &self,
        observer: Arc<dyn Subscribe<T>>,
    ) -> Result<Subscription, HubError> {
        let id = {
            let mut st = self.inner.lock();
            if st.disposed {
                return Err(HubError::Disposed {
                    stream: self.inner.name,
                });
            }
            let id = st.next_id;
            st.next_id += 1;
            st.entries.push(Entry { id, observer });
            id
        };

        let weak: Weak<StreamInner<T>> = Arc::downgrade(&self.inner);
        let source: Weak<dyn Detach> = weak;
        Ok(Subscription::new(self.inner.name, id, source))
    }

    /// Delivers `value` to every observer registered at call time.
    ///
    /// Returns the number of observers that handled the value without panicking.
    pub fn publish(&self, value: T) -> usize {
        let observers: Vec<Arc<dyn Subscribe<T>>> = {
            let st = self.inner.lock();
            if st.disposed {
                return 0;
            }
            st.entries.iter().map(|e| Arc::clone(&e.observer)).collect()
        };

        let mut delivered = 0;
        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_event(&value))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(
                        stream = self.inner.name,
                        subscriber = observer.name(),
                        panic = %panic_message(payload.as_ref()),
                        "subscriber panicked; continuing delivery"
                    );
                }
            }
        }
        delivered
    }

    /// Drops every observer and rejects further subscriptions. Idempotent.
    pub fn dispose(&self) {
        let dropped = {
            let mut st = self.inner.lock();
            st.disposed = true;
            std::mem::take(&mut st.entries)
        };
        // Observers are dropped outside the lock: their destructors may touch other streams.
        drop(dropped);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }
}

impl<T> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&u32) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        (hits, move |_: &u32| {
            h.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let stream = EventStream::<u32>::new("test");
        let (a, fa) = counter();
        let (b, fb) = counter();
        let _sa = stream.subscribe(fa).unwrap();
        let _sb = stream.subscribe(fb).unwrap();

        assert_eq!(stream.publish(1), 2);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_unsubscribes_detach_keeps() {
        let stream = EventStream::<u32>::new("test");
        let (a, fa) = counter();
        let (b, fb) = counter();
        drop(stream.subscribe(fa).unwrap());
        stream.subscribe(fb).unwrap().detach();

        stream.publish(1);
        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(stream.subscriber_count(), 1);
    }

    #[test]
    fn test_self_unsubscribe_during_publish() {
        let stream = EventStream::<u32>::new("test");
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let self_hits = Arc::new(AtomicUsize::new(0));

        let (before, f_before) = counter();
        let _s1 = stream.subscribe(f_before).unwrap();

        let slot_in = Arc::clone(&slot);
        let hits_in = Arc::clone(&self_hits);
        let sub = stream
            .subscribe(move |_| {
                hits_in.fetch_add(1, Ordering::SeqCst);
                if let Some(me) = slot_in.lock().unwrap().take() {
                    me.unsubscribe();
                }
            })
            .unwrap();
        *slot.lock().unwrap() = Some(sub);

        let (after, f_after) = counter();
        let _s3 = stream.subscribe(f_after).unwrap();

        assert_eq!(stream.publish(1), 3);
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);

        stream.publish(2);
        assert_eq!(self_hits.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 2);
        assert_eq!(stream.subscriber_count(), 2);
    }

    #[test]
    fn test_unsubscribe_other_during_publish_keeps_snapshot() {
        let stream = EventStream::<u32>::new("test");
        let victim_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot_in = Arc::clone(&victim_slot);
        let _killer = stream
            .subscribe(move |_| {
                if let Some(victim) = slot_in.lock().unwrap().take() {
                    victim.unsubscribe();
                }
            })
            .unwrap();

        let (victim_hits, f_victim) = counter();
        *victim_slot.lock().unwrap() = Some(stream.subscribe(f_victim).unwrap());

        stream.publish(1);
        assert_eq!(victim_hits.load(Ordering::SeqCst), 1, "already scheduled");
        stream.publish(2);
        assert_eq!(victim_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let stream = EventStream::<u32>::new("test");
        let _bad = stream.subscribe(|_| panic!("broken ui")).unwrap();
        let (good, f_good) = counter();
        let _good = stream.subscribe(f_good).unwrap();

        assert_eq!(stream.publish(1), 1);
        assert_eq!(good.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disposed_stream() {
        let stream = EventStream::<u32>::new("snapshots");
        let (hits, f) = counter();
        let sub = stream.subscribe(f).unwrap();

        stream.dispose();
        stream.dispose();
        assert!(stream.is_disposed());
        assert_eq!(stream.publish(1), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let err = stream.subscribe(|_| {}).unwrap_err();
        assert_eq!(err, HubError::Disposed { stream: "snapshots" });

        // Late unsubscribe after dispose is harmless.
        sub.unsubscribe();
    }

    #[test]
    fn test_named_observer() {
        struct Sum(AtomicUsize);
        impl Subscribe<u32> for Sum {
            fn on_event(&self, v: &u32) {
                self.0.fetch_add(*v as usize, Ordering::SeqCst);
            }
            fn name(&self) -> &'static str {
                "sum"
            }
        }

        let stream = EventStream::<u32>::new("test");
        let sum = Arc::new(Sum(AtomicUsize::new(0)));
        let _s = stream.subscribe_observer(sum.clone()).unwrap();
        stream.publish(3);
        stream.publish(4);
        assert_eq!(sum.0.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_concurrent_publish_and_subscribe() {
        let stream = EventStream::<u32>::new("test");
        let (hits, f) = counter();
        let _keep = stream.subscribe(f).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let st = stream.clone();
                s.spawn(move || {
                    for i in 0..100 {
                        st.publish(i);
                        let tmp = st.subscribe(|_| {}).unwrap();
                        drop(tmp);
                    }
                });
            }
        });

        assert_eq!(hits.load(Ordering::SeqCst), 400);
        assert_eq!(stream.subscriber_count(), 1);
    }
}
