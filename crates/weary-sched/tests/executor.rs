//! Executor integration tests: exactly-once execution, the drain barrier,
//! panic containment, fairness of fatigue-aware dispatch, and the worker
//! report format.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use weary_sched::{Executor, SchedError, Task};

fn counting_tasks(count: usize, counter: &Arc<AtomicUsize>) -> Vec<Task> {
    (0..count)
        .map(|_| {
            let counter = Arc::clone(counter);
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }) as Task
        })
        .collect()
}

#[test]
fn submit_all_runs_every_task_exactly_once() {
    let executor = Executor::new(4).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    executor.submit_all(counting_tasks(300, &counter)).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 300);
}

#[test]
fn submit_all_blocks_until_all_tasks_complete() {
    let executor = Executor::new(3).unwrap();
    let done = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<Task> = (0..20)
        .map(|_| {
            let done = Arc::clone(&done);
            Box::new(move || {
                thread::sleep(Duration::from_millis(5));
                done.fetch_add(1, Ordering::SeqCst);
            }) as Task
        })
        .collect();
    executor.submit_all(tasks).unwrap();
    // The barrier guarantees completion before return, not eventually.
    assert_eq!(done.load(Ordering::SeqCst), 20);
}

#[test]
fn submit_all_empty_returns_immediately() {
    let executor = Executor::new(2).unwrap();
    executor.submit_all(Vec::new()).unwrap();
}

#[test]
fn multiple_submit_all_batches() {
    let executor = Executor::new(2).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..5 {
        executor.submit_all(counting_tasks(40, &counter)).unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 200);
}

#[test]
fn panicking_tasks_do_not_wedge_the_drain_barrier() {
    let executor = Executor::new(2).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let mut tasks: Vec<Task> = Vec::new();
    for i in 0..20 {
        let counter = Arc::clone(&counter);
        tasks.push(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            if i % 4 == 0 {
                panic!("task {i} failed");
            }
        }));
    }
    executor.submit_all(tasks).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 20);

    // The pool is still serviceable afterwards.
    executor.submit_all(counting_tasks(10, &counter)).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 30);
}

#[test]
fn concurrent_submit_and_submit_all_do_not_interfere() {
    let executor = Arc::new(Executor::new(4).unwrap());
    let batch_count = Arc::new(AtomicUsize::new(0));
    let single_count = Arc::new(AtomicUsize::new(0));

    let batch_exec = Arc::clone(&executor);
    let batch_counter = Arc::clone(&batch_count);
    let batcher = thread::spawn(move || {
        batch_exec
            .submit_all(counting_tasks(100, &batch_counter))
            .unwrap();
    });

    for _ in 0..50 {
        let single_count = Arc::clone(&single_count);
        executor
            .submit(Box::new(move || {
                single_count.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
    }

    batcher.join().unwrap();
    assert_eq!(batch_count.load(Ordering::SeqCst), 100);
    // Lone submissions have no completion barrier of their own; flush them
    // with an empty drain via submit_all.
    executor.submit_all(counting_tasks(1, &single_count)).unwrap();
    assert_eq!(single_count.load(Ordering::SeqCst), 51);
}

#[test]
fn fatigue_dispatch_is_fair() {
    let executor = Executor::new(4).unwrap();
    let tasks: Vec<Task> = (0..400)
        .map(|_| {
            Box::new(|| {
                let mut acc = 0.0_f64;
                for i in 0..2_000 {
                    acc += (i as f64).sqrt();
                }
                std::hint::black_box(acc);
            }) as Task
        })
        .collect();
    executor.submit_all(tasks).unwrap();

    let fatigues = executor.fatigues();
    let max = fatigues.iter().cloned().fold(f64::MIN, f64::max);
    let min = fatigues.iter().cloned().fold(f64::MAX, f64::min);
    assert!(min > 0.0, "every worker must have run something: {fatigues:?}");
    assert!(
        max / min < 10.0,
        "fatigue spread too wide: min={min}, max={max}"
    );
}

#[test]
fn shutdown_completes_right_after_submit_all() {
    let mut executor = Executor::new(3).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    executor.submit_all(counting_tasks(30, &counter)).unwrap();
    executor.shutdown();
    assert_eq!(counter.load(Ordering::SeqCst), 30);
}

#[test]
fn shutdown_without_any_tasks() {
    let mut executor = Executor::new(5).unwrap();
    executor.shutdown();
    assert!(matches!(
        executor.submit(Box::new(|| {})),
        Err(SchedError::ExecutorShutDown)
    ));
}

#[test]
fn drop_shuts_the_pool_down() {
    let ran = Arc::new(AtomicBool::new(false));
    {
        let executor = Executor::new(2).unwrap();
        let task_ran = Arc::clone(&ran);
        let (tx, rx) = std::sync::mpsc::channel();
        executor
            .submit(Box::new(move || {
                task_ran.store(true, Ordering::SeqCst);
                let _ = tx.send(());
            }))
            .unwrap();
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        // Dropped here; drop must join the workers without hanging.
    }
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn worker_report_has_stable_shape() {
    let executor = Executor::new(3).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    executor.submit_all(counting_tasks(30, &counter)).unwrap();

    let report = executor.worker_report();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 3 + 3, "header, one line per worker, fairness, trailer");
    assert_eq!(lines[0], "========== Worker Report ==========");
    assert_eq!(lines[lines.len() - 1], "=======================================");

    for (index, line) in lines[1..=3].iter().enumerate() {
        assert!(
            line.starts_with(&format!("Worker {index} | fatigue=")),
            "bad worker line: {line}"
        );
        assert!(line.contains(" ms | idle="), "bad worker line: {line}");
        assert!(line.ends_with(" ms"), "bad worker line: {line}");
        let fatigue_field = line
            .split("fatigue=")
            .nth(1)
            .and_then(|rest| rest.split(' ').next())
            .unwrap();
        fatigue_field.parse::<f64>().expect("fatigue parses as f64");
    }

    let fairness_line = lines[lines.len() - 2];
    let value = fairness_line.strip_prefix("Fairness: ").unwrap();
    value.parse::<f64>().expect("fairness parses as f64");
}
