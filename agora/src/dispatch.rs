//! Run-to-completion event queue
//!
//! Every timer fire and every radio stack notification goes through one
//! [`EventQueue`]. Tasks run one at a time, in due-time order and FIFO among
//! equal due times, so handlers never need locking. Storage is fixed at `N`
//! pending entries.

use heapless::Vec;
use log::warn;

/// Milliseconds on the queue's own time base
pub type Millis = u64;

/// Handle to a posted task, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u32);

/// No free entry left in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

/// Why a dispatch call returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing left that is due
    Idle,
    /// A handler called [`Scheduler::break_dispatch`]
    Broken,
}

/// Scheduling side of the queue, as seen from inside a handler
pub trait Scheduler<T> {
    /// Run `task` as soon as the current handler returns
    fn post(&mut self, task: T) -> Result<TimerId, QueueFull>;
    /// Run `task` once, `delay_ms` from now
    fn post_in(&mut self, delay_ms: u32, task: T) -> Result<TimerId, QueueFull>;
    /// Run `task` every `period_ms`, first fire one period from now
    fn post_every(&mut self, period_ms: u32, task: T) -> Result<TimerId, QueueFull>;
    /// Drop a pending task, returns false if it already ran
    fn cancel(&mut self, id: TimerId) -> bool;
    /// Return from dispatching once the current handler finishes
    fn break_dispatch(&mut self);
}

/// Platform hooks for [`EventQueue::dispatch_forever`]
pub trait EventSource<T> {
    fn now(&mut self) -> Millis;

    /// Sleep until `deadline`, or forever when `None`, returning early with
    /// any notification raised meanwhile.
    fn wait(&mut self, deadline: Option<Millis>) -> Option<T>;
}

#[derive(Debug, Clone)]
struct Entry<T> {
    id: u32,
    seq: u64,
    due: Millis,
    period: Option<u32>,
    task: T,
}

pub struct EventQueue<T, const N: usize> {
    entries: Vec<Entry<T>, N>,
    now: Millis,
    next_id: u32,
    next_seq: u64,
    broken: bool,
}

impl<T: Clone, const N: usize> Default for EventQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, const N: usize> EventQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            now: 0,
            next_id: 0,
            next_seq: 0,
            broken: false,
        }
    }

    /// Time of the most recently dispatched task
    #[inline]
    pub fn now(&self) -> Millis {
        self.now
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Due time of the earliest pending task
    pub fn next_deadline(&self) -> Option<Millis> {
        self.entries.iter().map(|entry| entry.due).min()
    }

    /// Pending tasks in the order they will run
    pub fn pending(&self) -> impl Iterator<Item = (Millis, &T)> {
        let mut order: Vec<(Millis, u64, usize), N> = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            // same capacity as `entries`
            let _ = order.push((entry.due, entry.seq, index));
        }
        order.sort_unstable();
        order
            .into_iter()
            .map(move |(due, _, index)| (due, &self.entries[index].task))
    }

    fn schedule(&mut self, due: Millis, period: Option<u32>, task: T) -> Result<TimerId, QueueFull> {
        let id = self.next_id;
        let seq = self.next_seq;
        self.entries
            .push(Entry {
                id,
                seq,
                due,
                period,
                task,
            })
            .map_err(|_| QueueFull)?;
        self.next_id = self.next_id.wrapping_add(1);
        self.next_seq += 1;
        Ok(TimerId(id))
    }

    fn pop_due(&mut self, until: Millis) -> Option<Entry<T>> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= until)
            .min_by_key(|(_, entry)| (entry.due, entry.seq))
            .map(|(index, _)| index)?;
        Some(self.entries.swap_remove(index))
    }

    /// Run every task due at or before `until`, in order.
    ///
    /// Tasks posted by a handler run in the same call when they fall due
    /// before `until`. A handler error stops dispatching and is returned.
    pub fn dispatch_until<E, F>(&mut self, until: Millis, mut handler: F) -> Result<Dispatch, E>
    where
        F: FnMut(T, &mut Self) -> Result<(), E>,
    {
        while let Some(entry) = self.pop_due(until) {
            self.now = self.now.max(entry.due);

            if let Some(period) = entry.period {
                let rearmed = Entry {
                    seq: self.next_seq,
                    due: entry.due + Millis::from(period),
                    ..entry.clone()
                };
                self.next_seq += 1;
                // the popped entry freed a slot
                if self.entries.push(rearmed).is_err() {
                    warn!("periodic timer dropped: event queue full");
                }
            }

            handler(entry.task, self)?;

            if self.broken {
                self.broken = false;
                return Ok(Dispatch::Broken);
            }
        }

        self.now = self.now.max(until);
        Ok(Dispatch::Idle)
    }

    /// Run whatever is due right now
    pub fn dispatch_pending<E, F>(&mut self, handler: F) -> Result<Dispatch, E>
    where
        F: FnMut(T, &mut Self) -> Result<(), E>,
    {
        let now = self.now;
        self.dispatch_until(now, handler)
    }

    /// Dispatch until a handler breaks the loop or fails.
    ///
    /// Notifications returned by `source` while waiting are posted and run in
    /// arrival order.
    pub fn dispatch_forever<S, E, F>(&mut self, source: &mut S, mut handler: F) -> Result<(), E>
    where
        S: EventSource<T>,
        E: From<QueueFull>,
        F: FnMut(T, &mut Self) -> Result<(), E>,
    {
        loop {
            let now = source.now();
            if self.dispatch_until(now, &mut handler)? == Dispatch::Broken {
                return Ok(());
            }
            if let Some(task) = source.wait(self.next_deadline()) {
                self.now = self.now.max(source.now());
                self.post(task)?;
            }
        }
    }
}

impl<T: Clone, const N: usize> Scheduler<T> for EventQueue<T, N> {
    fn post(&mut self, task: T) -> Result<TimerId, QueueFull> {
        self.schedule(self.now, None, task)
    }

    fn post_in(&mut self, delay_ms: u32, task: T) -> Result<TimerId, QueueFull> {
        self.schedule(self.now + Millis::from(delay_ms), None, task)
    }

    fn post_every(&mut self, period_ms: u32, task: T) -> Result<TimerId, QueueFull> {
        self.schedule(self.now + Millis::from(period_ms), Some(period_ms), task)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        match self.entries.iter().position(|entry| entry.id == id.0) {
            Some(index) => {
                self.entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    fn break_dispatch(&mut self) {
        self.broken = true;
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;

    use super::{EventSource, Millis};

    /// Replays timestamped notifications, jumping the clock to each deadline
    pub struct Scripted<T> {
        pub now: Millis,
        pub events: VecDeque<(Millis, T)>,
    }

    impl<T> Scripted<T> {
        pub fn new(events: impl IntoIterator<Item = (Millis, T)>) -> Self {
            Scripted {
                now: 0,
                events: events.into_iter().collect(),
            }
        }
    }

    impl<T: Copy> EventSource<T> for Scripted<T> {
        fn now(&mut self) -> Millis {
            self.now
        }

        fn wait(&mut self, deadline: Option<Millis>) -> Option<T> {
            match self.events.front().copied() {
                Some((at, event)) if deadline.map_or(true, |d| at < d) => {
                    self.events.pop_front();
                    self.now = at;
                    Some(event)
                }
                _ => match deadline {
                    Some(deadline) => {
                        self.now = deadline;
                        None
                    }
                    None => panic!("wait forever with nothing scheduled"),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::Scripted;
    use super::*;

    use std::vec::Vec as StdVec;

    type Queue = EventQueue<&'static str, 8>;

    fn run(queue: &mut Queue, until: Millis) -> StdVec<(Millis, &'static str)> {
        let mut ran = StdVec::new();
        queue
            .dispatch_until(until, |task, queue| -> Result<(), QueueFull> {
                ran.push((queue.now(), task));
                Ok(())
            })
            .unwrap();
        ran
    }

    #[test]
    fn runs_in_due_order_then_fifo() {
        let mut queue = Queue::new();
        queue.post_in(50, "late").unwrap();
        queue.post("first").unwrap();
        queue.post_in(10, "early").unwrap();
        queue.post("second").unwrap();

        assert_eq!(
            run(&mut queue, 100),
            [(0, "first"), (0, "second"), (10, "early"), (50, "late")]
        );
        assert_eq!(queue.now(), 100);
        assert!(queue.is_empty());
    }

    #[test]
    fn leaves_future_tasks_pending() {
        let mut queue = Queue::new();
        queue.post_in(3_000, "retry").unwrap();

        assert!(run(&mut queue, 2_999).is_empty());
        assert_eq!(queue.next_deadline(), Some(3_000));
        assert_eq!(run(&mut queue, 3_000), [(3_000, "retry")]);
    }

    #[test]
    fn periodic_task_rearms() {
        let mut queue = Queue::new();
        queue.post_every(10_000, "tick").unwrap();

        assert_eq!(
            run(&mut queue, 35_000),
            [(10_000, "tick"), (20_000, "tick"), (30_000, "tick")]
        );
        assert_eq!(queue.next_deadline(), Some(40_000));
    }

    #[test]
    fn cancelled_task_never_runs() {
        let mut queue = Queue::new();
        let id = queue.post_every(100, "tick").unwrap();
        queue.post_in(50, "other").unwrap();

        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert_eq!(run(&mut queue, 1_000), [(50, "other")]);
    }

    #[test]
    fn handler_posts_run_in_same_dispatch() {
        let mut queue = Queue::new();
        queue.post("start").unwrap();

        let mut ran = StdVec::new();
        queue
            .dispatch_until(0, |task, queue| -> Result<(), QueueFull> {
                ran.push(task);
                if task == "start" {
                    queue.post("follow-up")?;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(ran, ["start", "follow-up"]);
    }

    #[test]
    fn break_stops_dispatching() {
        let mut queue = Queue::new();
        queue.post("stop").unwrap();
        queue.post("after").unwrap();

        let result = queue.dispatch_pending(|task, queue| {
            if task == "stop" {
                queue.break_dispatch();
            }
            Ok::<(), QueueFull>(())
        });
        assert_eq!(result, Ok(Dispatch::Broken));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn handler_error_is_returned() {
        let mut queue = Queue::new();
        queue.post("bad").unwrap();
        assert_eq!(
            queue.dispatch_pending(|_, _| Err::<(), _>("boom")),
            Err("boom")
        );
    }

    #[test]
    fn full_queue_rejects_post() {
        let mut queue: EventQueue<u8, 2> = EventQueue::new();
        queue.post(1).unwrap();
        queue.post(2).unwrap();
        assert_eq!(queue.post(3), Err(QueueFull));
    }

    #[test]
    fn pending_lists_run_order() {
        let mut queue = Queue::new();
        queue.post_in(20, "b").unwrap();
        queue.post_in(10, "a").unwrap();
        let pending: StdVec<_> = queue.pending().map(|(due, task)| (due, *task)).collect();
        assert_eq!(pending, [(10, "a"), (20, "b")]);
    }

    #[test]
    fn scripted_source_waits_for_deadline_past_its_events() {
        let mut source = Scripted::new([(5_000, "late")]);
        assert_eq!(source.wait(Some(1_000)), None);
        assert_eq!(source.now(), 1_000);
        assert_eq!(source.wait(None), Some("late"));
        assert_eq!(source.now(), 5_000);
    }

    #[test]
    fn forever_runs_timers_and_notifications() {
        let mut queue = Queue::new();
        queue.post_every(1_000, "tick").unwrap();
        let mut source = Scripted::new([(1_500, "event"), (2_500, "stop")]);

        let mut ran = StdVec::new();
        queue
            .dispatch_forever(&mut source, |task, queue| {
                ran.push((queue.now(), task));
                if task == "stop" {
                    queue.break_dispatch();
                }
                Ok::<(), QueueFull>(())
            })
            .unwrap();

        assert_eq!(
            ran,
            [
                (1_000, "tick"),
                (1_500, "event"),
                (2_000, "tick"),
                (2_500, "stop")
            ]
        );
    }
}
