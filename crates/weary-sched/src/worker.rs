use std::cmp::Ordering as CmpOrdering;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::error::SchedError;

/// A unit of work handed to a worker.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum Item {
    Run(Task),
    Poison,
}

/// State shared between a worker's owning handle and its thread.
#[derive(Debug)]
pub(crate) struct WorkerCore {
    id: usize,
    fatigue_factor: f64,
    alive: AtomicBool,
    busy: AtomicBool,
    time_used_ns: AtomicU64,
    time_idle_ns: AtomicU64,
    idle_since: Mutex<Option<Instant>>,
}

impl WorkerCore {
    pub(crate) fn fatigue(&self) -> f64 {
        self.fatigue_factor * self.time_used_ns.load(Ordering::Acquire) as f64
    }

    /// Executor completion path: the wrapped task clears the busy flag
    /// before re-inserting the worker into the idle set, so a dispatch that
    /// races the worker's own bookkeeping cannot observe a stale `busy`.
    pub(crate) fn clear_busy(&self) {
        self.busy.store(false, Ordering::Release);
    }

    fn mark_idle(&self) {
        *self.idle_since.lock() = Some(Instant::now());
    }

    fn close_idle_interval(&self) {
        if let Some(started) = self.idle_since.lock().take() {
            self.time_idle_ns
                .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
        }
    }

    fn run(&self, tasks: Receiver<Item>) {
        log::debug!(
            "worker {} up (fatigue factor {:.3})",
            self.id,
            self.fatigue_factor
        );
        self.mark_idle();
        loop {
            if !self.alive.load(Ordering::Acquire) {
                break;
            }
            let item = match tasks.recv() {
                Ok(item) => item,
                Err(_) => break,
            };
            let task = match item {
                Item::Poison => break,
                Item::Run(_) if !self.alive.load(Ordering::Acquire) => break,
                Item::Run(task) => task,
            };

            self.busy.store(true, Ordering::Release);
            self.close_idle_interval();

            let started = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            self.time_used_ns
                .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Release);
            if outcome.is_err() {
                log::warn!("worker {}: task panicked, worker stays alive", self.id);
            }

            self.busy.store(false, Ordering::Release);
            self.mark_idle();
        }
        self.close_idle_interval();
        log::debug!("worker {} down", self.id);
    }
}

/// A long-lived worker thread with a single-slot task handoff.
///
/// The worker blocks on its handoff, runs one task at a time, and tracks two
/// monotone counters: time spent running tasks and time spent idle. Its
/// scheduling key is `fatigue() = fatigue_factor × time_used`.
#[derive(Debug)]
pub struct Worker {
    core: Arc<WorkerCore>,
    sender: Sender<Item>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns a worker thread. `fatigue_factor` is fixed for the worker's
    /// lifetime.
    pub fn spawn(id: usize, fatigue_factor: f64) -> Result<Worker, SchedError> {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let core = Arc::new(WorkerCore {
            id,
            fatigue_factor,
            alive: AtomicBool::new(true),
            busy: AtomicBool::new(false),
            time_used_ns: AtomicU64::new(0),
            time_idle_ns: AtomicU64::new(0),
            idle_since: Mutex::new(None),
        });
        let thread_core = Arc::clone(&core);
        let handle = thread::Builder::new()
            .name(format!("weary-worker-{id}"))
            .spawn(move || thread_core.run(receiver))
            .map_err(SchedError::Spawn)?;
        Ok(Worker {
            core,
            sender,
            handle: Some(handle),
        })
    }

    /// Offers a task to this worker without blocking.
    ///
    /// The task will run exactly once. Fails if the worker has been shut
    /// down, is currently running a task, or already has a task waiting in
    /// its handoff slot.
    pub fn new_task(&self, task: Task) -> Result<(), SchedError> {
        if !self.core.alive.load(Ordering::Acquire) {
            return Err(SchedError::WorkerShutDown { id: self.core.id });
        }
        if self.core.busy.load(Ordering::Acquire) {
            return Err(SchedError::WorkerBusy { id: self.core.id });
        }
        match self.sender.try_send(Item::Run(task)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SchedError::SlotOccupied { id: self.core.id }),
            Err(TrySendError::Disconnected(_)) => {
                Err(SchedError::WorkerShutDown { id: self.core.id })
            }
        }
    }

    /// Requests the worker to stop once its current task (if any) finishes.
    /// Idempotent. The poison offer is best-effort: a full slot means the
    /// worker is about to wake anyway and will observe the cleared liveness
    /// flag.
    pub fn shutdown(&self) {
        if !self.core.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        let _ = self.sender.try_send(Item::Poison);
    }

    /// Joins the worker thread after [`shutdown`](Self::shutdown).
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("worker {} thread panicked", self.core.id);
            }
        }
    }

    pub fn id(&self) -> usize {
        self.core.id
    }

    pub fn fatigue_factor(&self) -> f64 {
        self.core.fatigue_factor
    }

    /// Current fatigue: `fatigue_factor × time_used`. Monotone
    /// non-decreasing.
    pub fn fatigue(&self) -> f64 {
        self.core.fatigue()
    }

    pub fn is_busy(&self) -> bool {
        self.core.busy.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.core.alive.load(Ordering::Acquire)
    }

    pub fn time_used(&self) -> Duration {
        Duration::from_nanos(self.core.time_used_ns.load(Ordering::Acquire))
    }

    pub fn time_idle(&self) -> Duration {
        Duration::from_nanos(self.core.time_idle_ns.load(Ordering::Acquire))
    }

    /// Total order on fatigue snapshots taken at the comparison instant,
    /// with the worker id as tiebreak. Antisymmetric by construction.
    pub fn cmp_by_fatigue(&self, other: &Worker) -> CmpOrdering {
        self.fatigue()
            .total_cmp(&other.fatigue())
            .then_with(|| self.core.id.cmp(&other.core.id))
    }

    pub(crate) fn core_arc(&self) -> Arc<WorkerCore> {
        Arc::clone(&self.core)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}
