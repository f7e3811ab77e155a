//! Task identity and one-shot result handles.

use std::any::Any;
use std::panic;

use crossbeam_channel::Receiver;

use crate::error::{PilumError, Result};

/// Identifier assigned to a submitted task. Monotonically increasing within
/// a pool, never reused.
pub type TaskId = u64;

/// The dynamically-typed value a task produces.
///
/// Callers downcast to the concrete type they submitted, mirroring the
/// type-erased submission API of [`ThreadPool::add_task`].
///
/// [`ThreadPool::add_task`]: crate::pool::ThreadPool::add_task
pub type TaskResult = Box<dyn Any + Send>;

/// What a worker sends back: the task's value, or the payload of a panic
/// raised inside its work.
pub(crate) type TaskOutcome = std::result::Result<TaskResult, Box<dyn Any + Send>>;

/// One-shot handle to a task's result.
///
/// A handle is created when the task is submitted and stored inside the pool
/// until a caller claims it with [`ThreadPool::get_future`] or
/// [`ThreadPool::wait_and_get`]. Claiming moves the handle out of the pool,
/// so a second claim for the same id fails with
/// [`PilumError::UnknownTask`] rather than silently yielding an empty
/// handle.
///
/// If the task's work panicked, the panic is re-raised on the thread that
/// consumes the handle; it never takes down a worker.
///
/// [`ThreadPool::get_future`]: crate::pool::ThreadPool::get_future
/// [`ThreadPool::wait_and_get`]: crate::pool::ThreadPool::wait_and_get
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    receiver: Receiver<TaskOutcome>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, receiver: Receiver<TaskOutcome>) -> Self {
        TaskHandle { id, receiver }
    }

    /// The id of the task this handle belongs to.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Whether the result is already available without blocking.
    pub fn is_ready(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Block until the task completes and return its type-erased result,
    /// consuming the handle.
    ///
    /// Re-raises the task's panic if its work panicked.
    pub fn get(self) -> Result<TaskResult> {
        match self.receiver.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            // The sender only disappears without sending if the pool was
            // torn down before the task ran, which graceful drain prevents.
            Err(_) => Err(PilumError::internal(format!(
                "result channel for task {} disconnected",
                self.id
            ))),
        }
    }

    /// Block until the task completes and downcast its result to `T`.
    ///
    /// Fails with an error naming the task id when the stored value is not
    /// a `T`.
    pub fn get_as<T: Any>(self) -> Result<T> {
        let id = self.id;
        let value = self.get()?;

        value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| PilumError::other(format!("task {id} result has an unexpected type")))
    }
}

/// A queued unit of work: the id plus the type-erased closure a worker runs.
pub(crate) struct QueuedTask {
    pub(crate) id: TaskId,
    pub(crate) work: Box<dyn FnOnce() -> TaskResult + Send>,
    pub(crate) outcome_tx: crossbeam_channel::Sender<TaskOutcome>,
}
