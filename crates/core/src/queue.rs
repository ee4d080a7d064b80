//! Task handoff between the batch producer and the workers.
//!
//! A single [`TaskSender`] feeds any number of [`TaskReceiver`] clones.
//! Every task is delivered to exactly one receiver. Closing the sender is
//! the only way workers learn there is no more work.

use crate::config::Task;
use crate::error::Result;
use crossbeam_channel::{bounded, Receiver, Sender};

/// Create a task queue holding at most `capacity` undelivered tasks.
///
/// With `capacity == 0` every push waits for a worker to take the task.
pub fn task_queue(capacity: usize) -> (TaskSender, TaskReceiver) {
    let (tx, rx) = bounded(capacity);
    (
        TaskSender {
            inner: tx,
            pushed: 0,
        },
        TaskReceiver { inner: rx },
    )
}

/// Producer half of the task queue.
#[derive(Debug)]
pub struct TaskSender {
    inner: Sender<Task>,
    pushed: usize,
}

impl TaskSender {
    /// Hand a task to the next available worker, blocking until one is
    /// ready or the buffer has room.
    pub fn push(&mut self, task: Task) -> Result<()> {
        self.inner.send(task)?;
        self.pushed += 1;
        Ok(())
    }

    /// Number of tasks accepted so far.
    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Close the queue. Workers drain what is left and then stop.
    pub fn close(self) -> usize {
        self.pushed
    }
}

/// Consumer half of the task queue.
#[derive(Debug, Clone)]
pub struct TaskReceiver {
    inner: Receiver<Task>,
}

impl TaskReceiver {
    /// Take the next task. Returns `None` once the queue is closed and
    /// drained.
    pub fn pull(&self) -> Option<Task> {
        self.inner.recv().ok()
    }
}

impl Iterator for TaskReceiver {
    type Item = Task;

    fn next(&mut self) -> Option<Task> {
        self.pull()
    }
}
