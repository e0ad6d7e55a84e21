//! # Ordered publication handoff.
//!
//! The repository produces views while its locks are held, but subscribers must never run under
//! a hub lock. The outbox bridges the two with tickets:
//!
//! ```text
//! mutation (repo locks held) ──► enqueue(batch) → Ticket(n)
//! after unlocking            ──► deliver(Ticket(n), f)
//!                                   ├─ called from inside a delivery on this thread → deferred
//!                                   └─ else wait until tickets < n are delivered,
//!                                      deliver batch n on this thread, wake the next one
//! ```
//!
//! ## Rules
//! - Batches are delivered in ticket order, so per-operation ordering matches storage order.
//! - Each caller delivers its own batch before returning; nobody delivers for someone else.
//! - A subscriber that mutates the hub from inside a callback gets a later ticket. Waiting on it
//!   there would never end, so it is deferred and delivered by the same thread once the outer
//!   batch is done.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::model::{GlobalActivity, OperationNotification, OperationSnapshot};

/// One value bound for one of the hub streams.
#[derive(Debug)]
pub(crate) enum Publication {
    Snapshots(Vec<OperationSnapshot>),
    Activity(GlobalActivity),
    Notification(OperationNotification),
}

/// Position of a batch in the delivery order. Must be passed to [`Outbox::deliver`].
#[must_use = "an undelivered ticket blocks every later delivery"]
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

#[derive(Default)]
struct OutboxState {
    next: u64,
    serving: u64,
    batches: HashMap<u64, Vec<Publication>>,
    /// Tickets given up after an unwind; skipped when their turn comes.
    abandoned: HashSet<u64>,
}

impl OutboxState {
    fn advance(&mut self) {
        self.serving += 1;
        while self.abandoned.remove(&self.serving) {
            self.batches.remove(&self.serving);
            self.serving += 1;
        }
    }
}

#[derive(Default)]
pub(crate) struct Outbox {
    state: Mutex<OutboxState>,
    turn: Condvar,
}

/// Deliveries in progress on this thread, innermost last.
struct Frame {
    outbox: usize,
    deferred: Vec<u64>,
}

thread_local! {
    static DELIVERING: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

impl Outbox {
    /// Reserves the next position and stores `batch` for it.
    pub(crate) fn enqueue(&self, batch: Vec<Publication>) -> Ticket {
        let mut st = self.lock();
        let n = st.next;
        st.next += 1;
        st.batches.insert(n, batch);
        Ticket(n)
    }

    /// Delivers the batch behind `ticket` on the calling thread, after every earlier one.
    pub(crate) fn deliver(&self, ticket: Ticket, mut f: impl FnMut(Publication)) {
        let key = self.key();
        let nested = DELIVERING.with(|d| {
            d.borrow_mut()
                .iter_mut()
                .rev()
                .find(|fr| fr.outbox == key)
                .map(|fr| fr.deferred.push(ticket.0))
                .is_some()
        });
        if nested {
            return;
        }

        let mut pending = vec![ticket.0];
        while !pending.is_empty() {
            let n = pending.remove(0);
            let batch = self.wait_turn(n);
            let turn = Turn::begin(self);
            for publication in batch {
                f(publication);
            }
            pending.extend(turn.finish());
        }
    }

    fn wait_turn(&self, n: u64) -> Vec<Publication> {
        let mut st = self.lock();
        while st.serving != n {
            st = self.turn.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
        st.batches.remove(&n).unwrap_or_default()
    }

    fn key(&self) -> usize {
        self as *const Outbox as usize
    }

    fn lock(&self) -> MutexGuard<'_, OutboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The current ticket is being delivered on this thread; hands the turn over when dropped.
struct Turn<'a> {
    outbox: &'a Outbox,
    done: bool,
}

impl<'a> Turn<'a> {
    fn begin(outbox: &'a Outbox) -> Self {
        DELIVERING.with(|d| {
            d.borrow_mut().push(Frame {
                outbox: outbox.key(),
                deferred: Vec::new(),
            })
        });
        Self {
            outbox,
            done: false,
        }
    }

    /// Ends the turn and returns the tickets deferred during it.
    fn finish(mut self) -> Vec<u64> {
        self.done = true;
        self.release()
    }

    fn release(&mut self) -> Vec<u64> {
        let deferred = DELIVERING
            .with(|d| d.borrow_mut().pop())
            .map(|fr| fr.deferred)
            .unwrap_or_default();
        let mut st = self.outbox.lock();
        if !self.done {
            st.abandoned.extend(deferred.iter().copied());
        }
        st.advance();
        drop(st);
        self.outbox.turn.notify_all();
        deferred
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn activity(n: usize) -> Publication {
        Publication::Activity(GlobalActivity {
            percent: None,
            in_progress_count: n,
        })
    }

    fn count(p: &Publication) -> usize {
        match p {
            Publication::Activity(a) => a.in_progress_count,
            _ => usize::MAX,
        }
    }

    #[test]
    fn test_batch_delivered_in_order() {
        let outbox = Outbox::default();
        let t = outbox.enqueue(vec![activity(0), activity(1), activity(2)]);
        let mut seen = Vec::new();
        outbox.deliver(t, |p| seen.push(count(&p)));
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_reentrant_ticket_is_delivered_after_outer_batch() {
        let outbox = Outbox::default();
        let t = outbox.enqueue(vec![activity(1)]);
        let mut seen = Vec::new();
        outbox.deliver(t, |p| {
            let n = count(&p);
            seen.push(n);
            if n == 1 {
                let inner = outbox.enqueue(vec![activity(2)]);
                // Deferred: returns without delivering or waiting.
                outbox.deliver(inner, |_| panic!("nested delivery must be deferred"));
            }
        });
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_later_ticket_waits_for_earlier_one() {
        let outbox = Arc::new(Outbox::default());
        let first = outbox.enqueue(vec![activity(1)]);
        let second = outbox.enqueue(vec![activity(2)]);
        let log = Arc::new(Mutex::new(Vec::new()));

        let (o, l) = (Arc::clone(&outbox), Arc::clone(&log));
        let late = std::thread::spawn(move || {
            o.deliver(second, |p| l.lock().unwrap().push(count(&p)));
        });
        std::thread::sleep(Duration::from_millis(50));
        assert!(log.lock().unwrap().is_empty());

        outbox.deliver(first, |p| log.lock().unwrap().push(count(&p)));
        late.join().unwrap();
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_unwinding_delivery_hands_over_the_turn() {
        let outbox = Arc::new(Outbox::default());
        let first = outbox.enqueue(vec![activity(1)]);
        let second = outbox.enqueue(vec![activity(2)]);

        let o = Arc::clone(&outbox);
        let res = std::thread::spawn(move || {
            o.deliver(first, |_| panic!("subscriber blew up"));
        })
        .join();
        assert!(res.is_err());

        let mut seen = Vec::new();
        outbox.deliver(second, |p| seen.push(count(&p)));
        assert_eq!(seen, vec![2]);
    }
}
