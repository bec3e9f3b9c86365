//! Discrete-event scheduler driving the simulation in virtual time.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use log::trace;

type Callback = Box<dyn FnOnce(&EventScheduler)>;

struct ScheduledEvent {
    at: Duration,
    seq: u64,
    callback: Callback,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    // BinaryHeap is a max-heap: earliest time, then earliest submission, wins
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Single-threaded event loop.
///
/// Each callback runs to completion before the next one starts; callbacks
/// due at the same time run in submission order.
#[derive(Default)]
pub struct EventScheduler {
    now: Cell<Duration>,
    next_seq: Cell<u64>,
    executed: Cell<u64>,
    queue: RefCell<BinaryHeap<ScheduledEvent>>,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Schedules `callback` to run `delay` after the current time
    pub fn schedule<F>(&self, delay: Duration, callback: F)
    where
        F: FnOnce(&EventScheduler) + 'static,
    {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let at = self.now() + delay;
        trace!("event #{} scheduled at {:?}", seq, at);
        self.queue.borrow_mut().push(ScheduledEvent {
            at,
            seq,
            callback: Box::new(callback),
        });
    }

    /// Number of events waiting to run
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Number of events run so far
    pub fn executed(&self) -> u64 {
        self.executed.get()
    }

    /// Runs the next event; returns false when the queue is empty
    pub fn step(&self) -> bool {
        // the queue borrow ends before the callback can schedule more events
        let next = self.queue.borrow_mut().pop();
        match next {
            Some(event) => {
                self.now.set(event.at);
                (event.callback)(self);
                self.executed.set(self.executed.get() + 1);
                true
            }
            None => false,
        }
    }

    /// Runs until no events remain; returns how many ran
    pub fn run(&self) -> u64 {
        let start = self.executed();
        while self.step() {}
        self.executed() - start
    }

    /// Runs events due at or before `deadline`, then advances time to it
    pub fn run_until(&self, deadline: Duration) -> u64 {
        let start = self.executed();
        loop {
            let due = self
                .queue
                .borrow()
                .peek()
                .map_or(false, |event| event.at <= deadline);
            if !due || !self.step() {
                break;
            }
        }
        if self.now() < deadline {
            self.now.set(deadline);
        }
        self.executed() - start
    }
}
