use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use crate::error::{DispatchError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Entry {
    priority: i32,
    seq: u64,
    job: Job,
}

// BinaryHeap is a max-heap: invert so the lowest (priority, seq) pops first.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

#[derive(Default)]
struct State {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    closed: bool,
}

struct Shared {
    state: Mutex<State>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Priority queue of deferred jobs with a single consumer thread.
///
/// Lower priority values run first; jobs of equal priority run in the order
/// they were pushed.
pub struct BufferedQueue {
    shared: Arc<Shared>,
    consumer: Option<JoinHandle<()>>,
}

impl BufferedQueue {
    /// Start the queue and its consumer thread.
    pub fn start() -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            ready: Condvar::new(),
        });
        let worker = Arc::clone(&shared);
        let consumer = thread::Builder::new()
            .name("ertza-buffered".to_string())
            .spawn(move || consume(&worker))
            .map_err(|err| error!(error = %err, "failed to spawn buffered consumer"))
            .ok();

        Self { shared, consumer }
    }

    /// Queue a job at the given priority.
    pub fn push(&self, priority: i32, job: impl FnOnce() + Send + 'static) -> Result<()> {
        let mut state = self.shared.lock();
        if state.closed || self.consumer.is_none() {
            return Err(DispatchError::QueueClosed);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Entry {
            priority,
            seq,
            job: Box::new(job),
        });
        drop(state);
        self.shared.ready.notify_one();
        Ok(())
    }

    /// Jobs waiting to run.
    pub fn len(&self) -> usize {
        self.shared.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the consumer and join it. Jobs still queued are dropped.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.lock();
            state.closed = true;
            let dropped = state.heap.len();
            state.heap.clear();
            if dropped > 0 {
                debug!(dropped, "discarding queued jobs on shutdown");
            }
        }
        self.shared.ready.notify_all();
        if let Some(consumer) = self.consumer.take() {
            if consumer.join().is_err() {
                error!("buffered consumer panicked");
            }
        }
    }
}

impl Drop for BufferedQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn consume(shared: &Shared) {
    loop {
        let entry = {
            let mut state = shared.lock();
            loop {
                if state.closed {
                    return;
                }
                if let Some(entry) = state.heap.pop() {
                    break entry;
                }
                state = shared
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        if catch_unwind(AssertUnwindSafe(entry.job)).is_err() {
            error!(priority = entry.priority, "buffered job panicked");
        }
    }
}
