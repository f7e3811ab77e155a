//! Generic task-scheduling engine.
//!
//! A [`ThreadPool`] runs arbitrary units of work on a fixed set of worker
//! threads behind one shared FIFO queue. Submission assigns each task a
//! monotonically increasing [`TaskId`] and records a one-shot [`TaskHandle`]
//! for its dynamically-typed result. Completion can be awaited per task
//! ([`ThreadPool::wait`]) or for the whole workload including tasks spawned
//! by other tasks ([`ThreadPool::wait_all`]).
//!
//! Shutdown is a graceful drain: submission stops, queued and in-flight
//! tasks run to completion, and results stay retrievable afterwards.

pub mod task;
pub mod thread_pool;

pub use task::{TaskHandle, TaskId, TaskResult};
pub use thread_pool::ThreadPool;
