// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Job bus: a named worker thread with synchronous hand-off.
//!
//! Every mutation of endpoint state runs on the endpoint's worker. Callers
//! get a blocking façade through [`Worker::post_and_wait`]; the FIFO queue
//! is what makes two calls from one thread observe each other's effects.

use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle, ThreadId};

use crate::error::{Error, Result};

type Job = Box<dyn FnOnce() + Send>;

/// A single-threaded job executor.
pub struct Worker {
    name: String,
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl Worker {
    /// Spawn a worker thread named `fdb-worker-<name>`.
    pub fn spawn(name: &str) -> Worker {
        let (tx, rx) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name(format!("fdb-worker-{}", name))
            .spawn(move || {
                for job in rx {
                    job();
                }
            })
            .expect("spawn worker thread");
        let thread_id = handle.thread().id();
        Worker {
            name: name.to_string(),
            tx: Some(tx),
            handle: Some(handle),
            thread_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the calling thread is the worker thread itself.
    pub fn on_worker(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn post_job(&self, job: Job) -> Result<()> {
        self.tx
            .as_ref()
            .ok_or(Error::WorkerGone)?
            .send(job)
            .map_err(|_| Error::WorkerGone)
    }

    /// Enqueue a job; returns false if the worker is gone.
    pub fn post<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_job(Box::new(f)).is_ok()
    }

    /// Run `f` on the worker and block until it returns.
    ///
    /// Called from the worker thread itself, `f` runs inline: the reconnect
    /// path re-enters endpoint operations from within a job and must not
    /// wait on its own queue.
    pub fn post_and_wait<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.on_worker() {
            return Ok(f());
        }
        let (done_tx, done_rx) = mpsc::channel();
        self.post_job(Box::new(move || {
            let _ = done_tx.send(f());
        }))?;
        done_rx.recv().map_err(|_| Error::WorkerGone)
    }

    /// Block until every job queued before this call has run.
    pub fn flush(&self) {
        let _ = self.post_and_wait(|| ());
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the queue lets the thread drain and exit.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if thread::current().id() != self.thread_id {
                let _ = handle.join();
            }
        }
    }
}
