//! A fatigue-aware worker pool.
//!
//! This crate provides the scheduling half of the evaluator: long-lived
//! worker threads with a capacity-1 task handoff, and an executor that
//! dispatches every task to the least-fatigued idle worker.
//!
//! # Architecture
//!
//! - [`Worker`]: one OS thread blocking on a bounded channel of capacity 1.
//!   Each worker carries an immutable random fatigue factor and accumulates
//!   the time it spends running tasks and sitting idle.
//! - [`Executor`]: owns the workers, an idle set ordered by fatigue
//!   (a min-heap keyed on the fatigue snapshot taken when the worker went
//!   idle), and a drain barrier counting in-flight tasks.
//!
//! # Scheduling policy
//!
//! `fatigue = fatigue_factor × time_used`. The idle heap always yields the
//! least-fatigued worker, so dispatch is a greedy load-balancing heuristic.
//! Because fatigue is monotone non-decreasing, a stale heap key can only
//! under-estimate a worker's load.
//!
//! # Thread safety
//!
//! Coordination uses `parking_lot` mutexes and condvars plus atomics; the
//! handoff itself is a `crossbeam-channel` bounded channel. Tasks that panic
//! are caught at the worker boundary: the worker stays alive and the task
//! still counts as completed for the drain barrier.

mod error;
mod executor;
mod worker;

pub use error::SchedError;
pub use executor::Executor;
pub use worker::{Task, Worker};
