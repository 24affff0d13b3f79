use thiserror::Error;

/// Errors raised by workers and the executor.
#[derive(Error, Debug)]
pub enum SchedError {
    #[error("executor requires at least one worker thread")]
    InvalidThreadCount,

    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),

    #[error("worker {id} has been shut down")]
    WorkerShutDown { id: usize },

    #[error("worker {id} is busy")]
    WorkerBusy { id: usize },

    #[error("worker {id} already has a task waiting")]
    SlotOccupied { id: usize },

    #[error("executor has been shut down")]
    ExecutorShutDown,
}
