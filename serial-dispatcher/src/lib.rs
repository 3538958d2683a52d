//! Single-threaded task dispatcher serializing the policy engine.
//! - post() is thread-safe and enqueues; callers never block on execution.
//! - run_until_idle()/advance() drive the queue deterministically, with a
//!   virtual clock for delayed tasks (the mode every test uses).
//! - spawn() moves the same loop onto a dedicated thread for live use.
//!
//! Tasks never run concurrently; immediate tasks run in FIFO order.

use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct DelayedTask {
    due: Duration,
    seq: u64,
    task: Task,
}

impl PartialEq for DelayedTask {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for DelayedTask {}

impl PartialOrd for DelayedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the BinaryHeap pops the earliest deadline first, FIFO on ties.
impl Ord for DelayedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Timers {
    heap: BinaryHeap<DelayedTask>,
    next_seq: u64,
    // Virtual elapsed time. advance() moves it by hand; the spawned thread
    // tracks real time against its start instant.
    now: Duration,
    running: bool,
}

impl Timers {
    fn pop_due(&mut self) -> Option<Task> {
        if self.heap.peek().is_some_and(|head| head.due <= self.now) {
            Some(self.heap.pop().unwrap().task)
        } else {
            None
        }
    }
}

struct Inner {
    ready: SegQueue<Task>,
    timers: Mutex<Timers>,
    wake: Condvar,
}

/// Handle to a serialized task queue. Clones share the same queue.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher {
            inner: Arc::new(Inner {
                ready: SegQueue::new(),
                timers: Mutex::new(Timers {
                    heap: BinaryHeap::new(),
                    next_seq: 0,
                    now: Duration::ZERO,
                    running: false,
                }),
                wake: Condvar::new(),
            }),
        }
    }

    /// Enqueue a task; it runs on the next drive of the loop.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.inner.ready.push(Box::new(task));
        // Lock pairs the notify with the sleeper's empty-check.
        let _guard = self.inner.timers.lock();
        self.inner.wake.notify_one();
    }

    /// Enqueue a task that fires once `delay` has elapsed on the loop's
    /// clock. Cancellation is by generation counters in the caller; a stale
    /// task simply finds nothing to do.
    pub fn post_delayed(&self, delay: Duration, task: impl FnOnce() + Send + 'static) {
        let mut timers = self.inner.timers.lock();
        let due = timers.now + delay;
        let seq = timers.next_seq;
        timers.next_seq += 1;
        timers.heap.push(DelayedTask {
            due,
            seq,
            task: Box::new(task),
        });
        self.inner.wake.notify_one();
    }

    /// Execute queued tasks, and delayed tasks already due, until none
    /// remain. Tasks posted by executed tasks run too.
    pub fn run_until_idle(&self) {
        loop {
            if let Some(task) = self.inner.ready.pop() {
                task();
                continue;
            }
            let due = self.inner.timers.lock().pop_due();
            match due {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Move the virtual clock forward, firing delayed tasks in deadline
    /// order and draining the immediate queue between firings.
    pub fn advance(&self, duration: Duration) {
        let target = self.inner.timers.lock().now + duration;
        loop {
            self.run_until_idle();
            let fired = {
                let mut timers = self.inner.timers.lock();
                let next_due = timers.heap.peek().map(|head| head.due);
                match next_due {
                    Some(due) if due <= target => {
                        let head = timers.heap.pop().unwrap();
                        timers.now = head.due;
                        Some(head.task)
                    }
                    _ => {
                        timers.now = target;
                        None
                    }
                }
            };
            match fired {
                Some(task) => task(),
                None => break,
            }
        }
        self.run_until_idle();
    }

    /// Run the loop on a dedicated thread until the returned handle is shut
    /// down. Delayed tasks use real elapsed time in this mode.
    pub fn spawn(&self) -> DispatcherThread {
        {
            let mut timers = self.inner.timers.lock();
            timers.running = true;
        }
        let inner = self.inner.clone();
        let epoch = Instant::now();
        let handle = thread::Builder::new()
            .name("serial-dispatcher".into())
            .spawn(move || run_loop(&inner, epoch))
            .expect("spawn dispatcher thread");
        DispatcherThread {
            inner: self.inner.clone(),
            handle: Some(handle),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

fn run_loop(inner: &Inner, epoch: Instant) {
    loop {
        while let Some(task) = inner.ready.pop() {
            task();
        }
        let fired = {
            let mut timers = inner.timers.lock();
            timers.now = epoch.elapsed();
            timers.pop_due()
        };
        if let Some(task) = fired {
            task();
            continue;
        }

        let mut timers = inner.timers.lock();
        if !timers.running {
            break;
        }
        if !inner.ready.is_empty() {
            continue;
        }
        timers.now = epoch.elapsed();
        if timers.heap.peek().is_some_and(|head| head.due <= timers.now) {
            continue;
        }
        match timers.heap.peek().map(|head| head.due) {
            Some(due) => {
                let wait = due - timers.now;
                let _ = inner.wake.wait_for(&mut timers, wait);
            }
            None => {
                inner.wake.wait(&mut timers);
            }
        }
    }
}

/// Owns the spawned loop thread; dropping it stops the loop.
pub struct DispatcherThread {
    inner: Arc<Inner>,
    handle: Option<JoinHandle<()>>,
}

impl DispatcherThread {
    /// Stop the loop after the task currently running, then join. Queued
    /// tasks that have not started are dropped.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        {
            let mut timers = self.inner.timers.lock();
            timers.running = false;
            self.inner.wake.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DispatcherThread {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex as StdMutex;

    fn recorder() -> (Arc<StdMutex<Vec<u32>>>, impl Fn(u32) -> Task) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let log2 = log.clone();
        let make = move |value: u32| -> Task {
            let log = log2.clone();
            Box::new(move || log.lock().unwrap().push(value))
        };
        (log, make)
    }

    #[test]
    fn posts_run_in_fifo_order() {
        let dispatcher = Dispatcher::new();
        let (log, task) = recorder();
        for i in 0..4 {
            dispatcher.post(task(i));
        }
        dispatcher.run_until_idle();
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn tasks_posted_by_tasks_run_in_the_same_drain() {
        let dispatcher = Dispatcher::new();
        let (log, task) = recorder();
        let d2 = dispatcher.clone();
        let inner = task(2);
        dispatcher.post(move || d2.post(inner));
        dispatcher.post(task(1));
        dispatcher.run_until_idle();
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn delayed_tasks_fire_in_deadline_order() {
        let dispatcher = Dispatcher::new();
        let (log, task) = recorder();
        dispatcher.post_delayed(Duration::from_millis(10), task(10));
        dispatcher.post_delayed(Duration::from_millis(5), task(5));
        dispatcher.post_delayed(Duration::from_millis(5), task(6));
        dispatcher.advance(Duration::from_millis(20));
        assert_eq!(*log.lock().unwrap(), vec![5, 6, 10]);
    }

    #[test]
    fn advance_only_fires_elapsed_deadlines() {
        let dispatcher = Dispatcher::new();
        let (log, task) = recorder();
        dispatcher.post_delayed(Duration::from_millis(5), task(5));
        dispatcher.advance(Duration::from_millis(3));
        assert!(log.lock().unwrap().is_empty());
        dispatcher.advance(Duration::from_millis(2));
        assert_eq!(*log.lock().unwrap(), vec![5]);
    }

    #[test]
    fn immediate_tasks_run_before_later_deadlines() {
        let dispatcher = Dispatcher::new();
        let (log, task) = recorder();
        let d2 = dispatcher.clone();
        let chained = task(1);
        dispatcher.post_delayed(Duration::from_millis(5), move || d2.post(chained));
        dispatcher.post_delayed(Duration::from_millis(10), task(2));
        dispatcher.advance(Duration::from_millis(10));
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn spawned_thread_executes_posts_and_delays() {
        let dispatcher = Dispatcher::new();
        let thread = dispatcher.spawn();

        let (tx, rx) = mpsc::channel();
        let tx2 = tx.clone();
        dispatcher.post(move || tx2.send("posted").unwrap());
        dispatcher.post_delayed(Duration::from_millis(10), move || {
            tx.send("delayed").unwrap()
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "posted");
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "delayed");
        thread.shutdown();
    }
}
