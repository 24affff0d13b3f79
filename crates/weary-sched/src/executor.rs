use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rand::Rng;

use crate::error::SchedError;
use crate::worker::{Task, Worker, WorkerCore};

/// Idle-set entry: the fatigue snapshot taken when the worker went idle.
/// Ordered inversely so the `BinaryHeap` pops the least-fatigued worker.
#[derive(Debug)]
struct IdleEntry {
    fatigue: f64,
    worker: usize,
}

impl PartialEq for IdleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for IdleEntry {}

impl PartialOrd for IdleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdleEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .fatigue
            .total_cmp(&self.fatigue)
            .then_with(|| other.worker.cmp(&self.worker))
    }
}

/// State shared between the executor and the completion path of wrapped
/// tasks.
#[derive(Debug)]
struct ExecShared {
    idle: Mutex<BinaryHeap<IdleEntry>>,
    idle_available: Condvar,
    shut_down: AtomicBool,
    in_flight: AtomicUsize,
    drain_lock: Mutex<()>,
    drained: Condvar,
}

impl ExecShared {
    /// Blocks until an idle worker is available and removes the
    /// least-fatigued one.
    fn take_idle(&self) -> Result<usize, SchedError> {
        let mut idle = self.idle.lock();
        loop {
            if self.shut_down.load(Ordering::Acquire) {
                return Err(SchedError::ExecutorShutDown);
            }
            if let Some(entry) = idle.pop() {
                return Ok(entry.worker);
            }
            self.idle_available.wait(&mut idle);
        }
    }

    fn reinsert(&self, worker: usize, fatigue: f64) {
        let mut idle = self.idle.lock();
        idle.push(IdleEntry { fatigue, worker });
        self.idle_available.notify_one();
    }

    fn complete_one(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.drain_lock.lock();
            self.drained.notify_all();
        }
    }

    fn await_drain(&self) {
        let mut guard = self.drain_lock.lock();
        while self.in_flight.load(Ordering::Acquire) > 0 {
            self.drained.wait(&mut guard);
        }
    }
}

/// Runs on every wrapped-task exit path: normal return, panic unwind, or the
/// task being dropped unexecuted after a failed handoff. Re-inserts the
/// worker into the idle set with a fresh fatigue snapshot and retires the
/// in-flight count, signalling the drain barrier at zero.
struct Completion {
    shared: Arc<ExecShared>,
    core: Arc<WorkerCore>,
    worker: usize,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.core.clear_busy();
        self.shared.reinsert(self.worker, self.core.fatigue());
        self.shared.complete_one();
    }
}

/// A pool of fatiguing workers with fairness-ordered dispatch.
///
/// `submit` blocks only on the idle set and always hands the task to the
/// least-fatigued idle worker. `submit_all` additionally blocks until every
/// submitted task has completed.
#[derive(Debug)]
pub struct Executor {
    workers: Vec<Worker>,
    shared: Arc<ExecShared>,
    shut_down: bool,
}

impl Executor {
    /// Creates `num_threads` workers with fatigue factors drawn from
    /// `Uniform[0.5, 1.5)` and seeds the idle set with all of them.
    pub fn new(num_threads: usize) -> Result<Executor, SchedError> {
        if num_threads == 0 {
            return Err(SchedError::InvalidThreadCount);
        }
        let mut rng = rand::thread_rng();
        let mut workers = Vec::with_capacity(num_threads);
        for id in 0..num_threads {
            workers.push(Worker::spawn(id, rng.gen_range(0.5..1.5))?);
        }

        let mut idle = BinaryHeap::with_capacity(num_threads);
        for (index, worker) in workers.iter().enumerate() {
            idle.push(IdleEntry {
                fatigue: worker.fatigue(),
                worker: index,
            });
        }

        log::debug!("executor up with {num_threads} workers");
        Ok(Executor {
            workers,
            shared: Arc::new(ExecShared {
                idle: Mutex::new(idle),
                idle_available: Condvar::new(),
                shut_down: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                drain_lock: Mutex::new(()),
                drained: Condvar::new(),
            }),
            shut_down: false,
        })
    }

    /// Schedules `task` on the least-fatigued idle worker, blocking until
    /// one is available. The task is counted in-flight until it completes
    /// (normally or by panic).
    pub fn submit(&self, task: Task) -> Result<(), SchedError> {
        let index = self.shared.take_idle()?;
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);

        let completion = Completion {
            shared: Arc::clone(&self.shared),
            core: self.workers[index].core_arc(),
            worker: index,
        };
        let wrapped: Task = Box::new(move || {
            let _completion = completion;
            task();
        });

        // A rejected handoff drops the wrapped task, which runs the same
        // completion path before the error is returned.
        self.workers[index].new_task(wrapped)
    }

    /// Submits every task in order, then blocks until all in-flight tasks
    /// have drained. Empty input returns immediately. If a submission fails
    /// midway, the already-submitted prefix is still drained before the
    /// error is returned.
    pub fn submit_all(&self, tasks: Vec<Task>) -> Result<(), SchedError> {
        if tasks.is_empty() {
            return Ok(());
        }
        let count = tasks.len();
        let mut first_error = None;
        for task in tasks {
            if let Err(err) = self.submit(task) {
                log::warn!("submit_all aborted: {err}");
                first_error = Some(err);
                break;
            }
        }
        self.shared.await_drain();
        log::trace!("drained {count} tasks");
        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Stops and joins every worker, then clears the idle set. Idempotent;
    /// also runs on drop. Blocked `submit` callers are woken with
    /// [`SchedError::ExecutorShutDown`].
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        log::debug!("executor shutting down");
        self.shared.shut_down.store(true, Ordering::Release);
        self.shared.idle_available.notify_all();
        for worker in &self.workers {
            worker.shutdown();
        }
        for worker in &mut self.workers {
            worker.join();
        }
        self.shared.idle.lock().clear();
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Current fatigue of every worker, in creation order.
    pub fn fatigues(&self) -> Vec<f64> {
        self.workers.iter().map(Worker::fatigue).collect()
    }

    /// Human-readable per-worker statistics plus a fairness scalar (the sum
    /// of squared deviations of per-worker fatigue from the pool mean).
    pub fn worker_report(&self) -> String {
        let fatigues = self.fatigues();
        let mean = fatigues.iter().sum::<f64>() / fatigues.len() as f64;
        let fairness: f64 = fatigues.iter().map(|f| (f - mean) * (f - mean)).sum();

        let mut report = String::new();
        report.push_str("========== Worker Report ==========\n");
        for worker in &self.workers {
            let used_ms = worker.time_used().as_secs_f64() * 1e3;
            let idle_ms = worker.time_idle().as_secs_f64() * 1e3;
            let _ = writeln!(
                report,
                "Worker {} | fatigue={:.3} | used={:.3} ms | idle={:.3} ms",
                worker.id(),
                worker.fatigue(),
                used_ms,
                idle_ms,
            );
        }
        let _ = writeln!(report, "Fairness: {fairness:.3}");
        report.push_str("=======================================");
        report
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
