//! Fixed-size worker pool with per-task result handles.

use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::bounded;
use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex};

use crate::error::{PilumError, Result};
use crate::pool::task::{QueuedTask, TaskHandle, TaskId, TaskResult};

/// State shared between the pool facade and its worker threads.
struct PoolShared {
    /// Pending tasks in submission order.
    queue: Mutex<VecDeque<QueuedTask>>,
    queue_cv: Condvar,

    /// Ids of tasks whose work has finished running.
    completed: Mutex<HashSet<TaskId>>,
    completed_cv: Condvar,

    /// Unclaimed result handles, keyed by task id. An entry is removed when
    /// a caller claims it, so a handle can be consumed exactly once.
    handles: Mutex<HashMap<TaskId, TaskHandle>>,

    /// Count of ids ever issued. Read fresh by `wait_all` on every wake so
    /// tasks submitted by other tasks extend the wait.
    submitted: AtomicU64,

    /// Set when shutdown begins: no new submissions, workers drain and exit.
    draining: AtomicBool,

    /// Set once every worker has exited.
    shutdown: AtomicBool,
}

/// A fixed set of worker threads consuming one FIFO task queue.
///
/// Each submitted unit of work receives a monotonically increasing
/// [`TaskId`] and a one-shot [`TaskHandle`] through which its
/// dynamically-typed result (or captured panic) is retrieved exactly once.
/// Tasks may themselves submit further tasks; [`ThreadPool::wait_all`]
/// keeps waiting until the whole tree has drained.
///
/// # Examples
///
/// ```
/// use pilum::pool::ThreadPool;
///
/// let pool = ThreadPool::new(4).unwrap();
/// let id = pool.add_task(|| 6 * 7).unwrap();
///
/// let answer: i32 = pool.get_future(id).unwrap().get_as().unwrap();
/// assert_eq!(answer, 42);
/// ```
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Create a pool with `worker_count` threads (at least one).
    pub fn new(worker_count: usize) -> Result<Self> {
        let worker_count = worker_count.max(1);

        let shared = Arc::new(PoolShared {
            queue: Mutex::new(VecDeque::new()),
            queue_cv: Condvar::new(),
            completed: Mutex::new(HashSet::new()),
            completed_cv: Condvar::new(),
            handles: Mutex::new(HashMap::new()),
            submitted: AtomicU64::new(0),
            draining: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        });

        let mut workers = Vec::with_capacity(worker_count);

        for i in 0..worker_count {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("pilum-worker-{i}"))
                .spawn(move || Self::worker_loop(&shared))
                .map_err(|e| {
                    PilumError::internal(format!("failed to spawn worker thread: {e}"))
                })?;
            workers.push(handle);
        }

        debug!("started worker pool with {worker_count} threads");

        Ok(ThreadPool {
            shared,
            workers: Mutex::new(workers),
        })
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Submit a unit of work and get its task id.
    ///
    /// The work's return value is type-erased; retrieve it through
    /// [`get_future`](Self::get_future) /
    /// [`wait_and_get`](Self::wait_and_get) and downcast. Fails with
    /// [`PilumError::PoolClosed`] once shutdown has begun.
    pub fn add_task<F, R>(&self, work: F) -> Result<TaskId>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Any + Send + 'static,
    {
        if self.shared.draining.load(Ordering::Acquire) {
            return Err(PilumError::PoolClosed);
        }

        let id = self.shared.submitted.fetch_add(1, Ordering::AcqRel);
        let (outcome_tx, outcome_rx) = bounded(1);

        self.shared
            .handles
            .lock()
            .insert(id, TaskHandle::new(id, outcome_rx));

        self.shared.queue.lock().push_back(QueuedTask {
            id,
            work: Box::new(move || Box::new(work()) as TaskResult),
            outcome_tx,
        });
        self.shared.queue_cv.notify_one();

        trace!("queued task {id}");

        Ok(id)
    }

    /// Claim the one-shot result handle for `id`, moving it out of the pool.
    ///
    /// A second claim for the same id fails with
    /// [`PilumError::UnknownTask`]; the handle store never hands back an
    /// already-consumed handle.
    pub fn get_future(&self, id: TaskId) -> Result<TaskHandle> {
        self.shared
            .handles
            .lock()
            .remove(&id)
            .ok_or(PilumError::UnknownTask(id))
    }

    /// Block until `id` has completed or the pool has shut down.
    ///
    /// Does not consume the task's result.
    pub fn wait(&self, id: TaskId) {
        let mut completed = self.shared.completed.lock();

        while !completed.contains(&id) && !self.shared.shutdown.load(Ordering::Acquire) {
            self.shared.completed_cv.wait(&mut completed);
        }
    }

    /// Block until every task ever submitted has completed, or the pool has
    /// shut down.
    ///
    /// The submitted count is re-read on every wake rather than snapshotted
    /// at call time, so tasks that fan out further tasks while this call is
    /// blocked are waited for as well.
    pub fn wait_all(&self) {
        let mut completed = self.shared.completed.lock();

        loop {
            let submitted = self.shared.submitted.load(Ordering::Acquire);
            let done = completed.len() as u64 == submitted;

            if done || self.shared.shutdown.load(Ordering::Acquire) {
                return;
            }

            self.shared.completed_cv.wait(&mut completed);
        }
    }

    /// Claim the handle for `id`, block for its result, and return it.
    ///
    /// The handle entry is removed permanently, so a repeat call fails with
    /// [`PilumError::UnknownTask`].
    pub fn wait_and_get(&self, id: TaskId) -> Result<TaskResult> {
        self.get_future(id)?.get()
    }

    /// Non-blocking check whether `id` has completed.
    pub fn is_task_finished(&self, id: TaskId) -> bool {
        self.shared.completed.lock().contains(&id)
    }

    /// Shut the pool down: refuse new tasks, drain everything already
    /// queued, join the workers, then clear completion bookkeeping.
    ///
    /// Idempotent; a second call returns immediately. Running tasks are
    /// never aborted, and their results remain retrievable through handles
    /// claimed before or after shutdown.
    pub fn shutdown(&self) {
        if self.shared.draining.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!("worker pool shutting down");
        self.shared.queue_cv.notify_all();

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            // Workers shield themselves from task panics, so join only
            // fails if the runtime is already unwinding.
            let _ = worker.join();
        }

        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.completed_cv.notify_all();
        self.shared.completed.lock().clear();
    }

    /// Worker state machine: sleep while the queue is empty, run tasks in
    /// FIFO order, and exit once draining is requested and the queue is dry.
    fn worker_loop(shared: &PoolShared) {
        loop {
            let task = {
                let mut queue = shared.queue.lock();
                loop {
                    if let Some(task) = queue.pop_front() {
                        break Some(task);
                    }
                    if shared.draining.load(Ordering::Acquire) {
                        break None;
                    }
                    shared.queue_cv.wait(&mut queue);
                }
            };

            let Some(QueuedTask {
                id,
                work,
                outcome_tx,
            }) = task
            else {
                return;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(work));
            if outcome.is_err() {
                warn!("task {id} panicked; the panic is held for its handle");
            }

            // The receiver may already be gone if the caller dropped the
            // handle without consuming it.
            let _ = outcome_tx.send(outcome);

            shared.completed.lock().insert(id);
            shared.completed_cv.notify_all();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_single_task_execution() {
        let pool = ThreadPool::new(4).unwrap();
        let id = pool.add_task(|| 42).unwrap();

        let answer: i32 = pool.get_future(id).unwrap().get_as().unwrap();
        assert_eq!(answer, 42);
    }

    #[test]
    fn test_multiple_tasks_each_result_exactly_once() {
        let pool = ThreadPool::new(4).unwrap();

        let handles: Vec<_> = (0..10usize)
            .map(|i| {
                let id = pool.add_task(move || i).unwrap();
                pool.get_future(id).unwrap()
            })
            .collect();

        let mut results: Vec<usize> = handles
            .into_iter()
            .map(|h| h.get_as().unwrap())
            .collect();
        results.sort_unstable();

        assert_eq!(results, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_get_future_twice_fails() {
        let pool = ThreadPool::new(2).unwrap();
        let id = pool.add_task(|| ()).unwrap();

        let _handle = pool.get_future(id).unwrap();
        match pool.get_future(id) {
            Err(PilumError::UnknownTask(unknown)) => assert_eq!(unknown, id),
            other => panic!("expected UnknownTask, got {other:?}"),
        }
    }

    #[test]
    fn test_wait_and_get_removes_handle() {
        let pool = ThreadPool::new(2).unwrap();
        let id = pool.add_task(|| 456).unwrap();

        let result = pool.wait_and_get(id).unwrap();
        assert_eq!(result.downcast_ref::<i32>(), Some(&456));

        assert!(matches!(
            pool.wait_and_get(id),
            Err(PilumError::UnknownTask(_))
        ));
    }

    #[test]
    fn test_wait_for_specific_task() {
        let pool = ThreadPool::new(2).unwrap();
        let id = pool
            .add_task(|| {
                thread::sleep(Duration::from_millis(100));
                123
            })
            .unwrap();

        pool.wait(id);

        assert!(pool.is_task_finished(id));
        let value: i32 = pool.get_future(id).unwrap().get_as().unwrap();
        assert_eq!(value, 123);
    }

    #[test]
    fn test_wait_all_tasks() {
        let pool = ThreadPool::new(4).unwrap();
        let ids: Vec<_> = (0..5u64)
            .map(|i| {
                pool.add_task(move || {
                    thread::sleep(Duration::from_millis(10 * i));
                    i
                })
                .unwrap()
            })
            .collect();

        pool.wait_all();

        for id in ids {
            assert!(pool.is_task_finished(id));
        }
    }

    #[test]
    fn test_wait_all_covers_recursive_fan_out() {
        let pool = Arc::new(ThreadPool::new(4).unwrap());
        let counter = Arc::new(AtomicUsize::new(0));

        let pool_for_root = Arc::clone(&pool);
        let counter_for_root = Arc::clone(&counter);
        pool.add_task(move || {
            thread::sleep(Duration::from_millis(20));
            for _ in 0..3 {
                let pool_for_child = Arc::clone(&pool_for_root);
                let counter_for_child = Arc::clone(&counter_for_root);
                pool_for_root
                    .add_task(move || {
                        thread::sleep(Duration::from_millis(20));
                        let counter_for_leaf = Arc::clone(&counter_for_child);
                        pool_for_child
                            .add_task(move || {
                                counter_for_leaf.fetch_add(1, Ordering::SeqCst);
                            })
                            .unwrap();
                        counter_for_child.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
            }
            counter_for_root.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        pool.wait_all();

        // Root + 3 children + 3 grandchildren.
        assert_eq!(counter.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_add_task_after_shutdown_fails() {
        let pool = ThreadPool::new(2).unwrap();
        pool.shutdown();

        assert!(matches!(
            pool.add_task(|| 789),
            Err(PilumError::PoolClosed)
        ));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let pool = ThreadPool::new(2).unwrap();
        pool.shutdown();
        pool.shutdown();
    }

    #[test]
    fn test_running_task_completes_across_shutdown() {
        let pool = ThreadPool::new(2).unwrap();
        let id = pool
            .add_task(|| {
                thread::sleep(Duration::from_millis(200));
                42
            })
            .unwrap();
        let handle = pool.get_future(id).unwrap();

        pool.shutdown();

        let value: i32 = handle.get_as().unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_burst_submission_then_shutdown_drains() {
        let pool = ThreadPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.add_task(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        pool.shutdown();

        // Graceful drain: every queued task ran.
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_panicking_task_poisons_only_its_handle() {
        let pool = ThreadPool::new(2).unwrap();

        let bad = pool.add_task(|| panic!("task exploded")).unwrap();
        let good = pool.add_task(|| 7).unwrap();

        pool.wait_all();

        let value: i32 = pool.get_future(good).unwrap().get_as().unwrap();
        assert_eq!(value, 7);

        let handle = pool.get_future(bad).unwrap();
        let reraised = panic::catch_unwind(AssertUnwindSafe(move || handle.get()));
        assert!(reraised.is_err());
    }

    #[test]
    fn test_concurrent_submitters() {
        let pool = Arc::new(ThreadPool::new(4).unwrap());
        let mut submitters = Vec::new();

        for i in 0..10usize {
            let pool = Arc::clone(&pool);
            submitters.push(thread::spawn(move || {
                let id = pool.add_task(move || i).unwrap();
                let result = pool.wait_and_get(id).unwrap();
                *result.downcast_ref::<usize>().unwrap()
            }));
        }

        let mut results: Vec<usize> = submitters
            .into_iter()
            .map(|t| t.join().unwrap())
            .collect();
        results.sort_unstable();

        assert_eq!(results, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_stress_many_tasks() {
        let pool = ThreadPool::new(4).unwrap();

        let ids: Vec<_> = (0..1000usize)
            .map(|i| pool.add_task(move || i).unwrap())
            .collect();

        pool.wait_all();

        for id in ids {
            assert!(pool.is_task_finished(id));
        }
    }
}
