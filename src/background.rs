//! Background Task Queue
//!
//! One worker thread consuming a FIFO channel. Flushes (and the compactions
//! they trigger) run here so foreground writes never wait on disk merges.
//!
//! ```text
//!  put() ──► rotate ──► submit(FlushTask) ──► [ channel ] ──► worker thread
//!                                                              │
//!  sync_background() ──► Barrier ─────────────────────────────►│ ack
//!  close() / drop ──────► Shutdown ───────────────────────────►│ exit, join
//! ```
//!
//! After a task fails, the failure is kept and reported by `health`,
//! `submit`, `wait_idle` and `shutdown`. Tasks still in the channel are
//! discarded.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{Result, StrataError};

/// Unit of background work
pub trait Task: Send {
    /// Task name for logging
    fn name(&self) -> &'static str;

    /// Execute the task
    fn run(self: Box<Self>) -> Result<()>;
}

enum Message {
    Run(Box<dyn Task>),
    /// Acknowledged once everything queued before it has run
    Barrier(Sender<()>),
    Shutdown,
}

/// Single-consumer queue with one worker thread
pub struct TaskQueue {
    sender: Sender<Message>,
    worker: Option<JoinHandle<()>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl TaskQueue {
    /// Spawn the worker thread
    pub fn start(name: &str) -> Result<Self> {
        let (sender, receiver) = channel::unbounded();
        let failure = Arc::new(Mutex::new(None));

        let worker_failure = failure.clone();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(receiver, worker_failure))?;

        tracing::debug!(name, "Started background worker");
        Ok(Self {
            sender,
            worker: Some(worker),
            failure,
        })
    }

    /// Enqueue a task. Never blocks.
    pub fn submit(&self, task: Box<dyn Task>) -> Result<()> {
        self.health()?;
        self.sender
            .send(Message::Run(task))
            .map_err(|_| StrataError::Background("worker has exited".to_string()))
    }

    /// The recorded failure, if any task has failed
    pub fn health(&self) -> Result<()> {
        match self.failure.lock().as_ref() {
            Some(msg) => Err(StrataError::Background(msg.clone())),
            None => Ok(()),
        }
    }

    /// Record a failure that happened outside the worker. The first failure
    /// recorded is kept.
    pub fn record_failure(&self, msg: String) {
        let mut failure = self.failure.lock();
        if failure.is_none() {
            tracing::error!(error = %msg, "Recorded engine failure");
            *failure = Some(msg);
        }
    }

    /// Block until every task submitted so far has finished
    pub fn wait_idle(&self) -> Result<()> {
        let (ack_tx, ack_rx) = channel::bounded(1);
        self.sender
            .send(Message::Barrier(ack_tx))
            .map_err(|_| StrataError::Background("worker has exited".to_string()))?;
        ack_rx
            .recv()
            .map_err(|_| StrataError::Background("worker exited before finishing".to_string()))?;
        self.health()
    }

    /// Run everything still queued, stop the worker and join it
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            // Fails only if the worker is already gone; join reports why
            let _ = self.sender.send(Message::Shutdown);
            worker
                .join()
                .map_err(|_| StrataError::Background("worker panicked".to_string()))?;
            tracing::debug!("Background worker stopped");
        }
        self.health()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "Background worker ended with a failure");
        }
    }
}

fn worker_loop(receiver: Receiver<Message>, failure: Arc<Mutex<Option<String>>>) {
    for message in receiver.iter() {
        match message {
            Message::Run(task) => {
                let name = task.name();
                if failure.lock().is_some() {
                    tracing::error!(task = name, "Discarding task after earlier failure");
                    continue;
                }
                if let Err(e) = task.run() {
                    tracing::error!(task = name, error = %e, "Background task failed");
                    *failure.lock() = Some(format!("{} task failed: {}", name, e));
                }
            }
            Message::Barrier(ack) => {
                let _ = ack.send(());
            }
            Message::Shutdown => break,
        }
    }
}
