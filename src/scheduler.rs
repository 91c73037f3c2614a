//! A round-based job scheduler driven by a logical clock of whole seconds

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry<J> {
    due: u64,
    seq: u64,
    job: J,
}

impl<J> PartialEq for Entry<J> {
    fn eq(&self, other: &Self) -> bool {
        (self.due, self.seq) == (other.due, other.seq)
    }
}

impl<J> Eq for Entry<J> {}

impl<J> PartialOrd for Entry<J> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<J> Ord for Entry<J> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Queue of jobs waiting for the logical clock to reach their due time
///
/// The clock only moves when [`Scheduler::advance`] is called, so a loop
/// that stalls delays its jobs instead of skipping them. Jobs due at the
/// same second come out in the order they were scheduled.
#[derive(Debug)]
pub struct Scheduler<J> {
    now: u64,
    seq: u64,
    queue: BinaryHeap<Reverse<Entry<J>>>,
}

impl<J> Scheduler<J> {
    pub fn new() -> Self {
        Self {
            now: 0,
            seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Seconds elapsed on the logical clock
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Queue a job to run `delay` seconds from now
    pub fn schedule(&mut self, delay: u64, job: J) {
        let entry = Entry {
            due: self.now.saturating_add(delay),
            seq: self.seq,
            job,
        };
        self.seq += 1;
        self.queue.push(Reverse(entry));
    }

    /// Move the clock forward by one second
    pub fn advance(&mut self) {
        self.now += 1;
    }

    /// Take the next job that is due, if any
    pub fn pop_due(&mut self) -> Option<J> {
        if self.queue.peek()?.0.due > self.now {
            return None;
        }

        self.queue.pop().map(|Reverse(entry)| entry.job)
    }

    /// Number of jobs waiting, due or not
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<J> Default for Scheduler<J> {
    fn default() -> Self {
        Self::new()
    }
}
