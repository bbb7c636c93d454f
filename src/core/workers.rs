//! Small thread pool for fire-and-forget side work (feedback sounds).
//!
//! Uses crossbeam for an MPMC queue with closure-based task execution, so the
//! scan loop never waits on a child process.

use crossbeam::channel::{Sender, unbounded};
use log::{debug, error};
use std::io;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool for blocking side effects triggered by scans.
///
/// # Example
/// ```ignore
/// let workers = Workers::new(2)?;
/// workers.execute(move || {
///     if let Err(e) = Command::new("aplay").arg(path).status() {
///         log::warn!("Feedback failed: {}", e);
///     }
/// });
/// ```
pub struct Workers {
    sender: Sender<Job>,
    _handles: Vec<thread::JoinHandle<()>>, // Keep handles to prevent premature drop
}

impl Workers {
    /// Create worker pool with `num_threads` threads (at least one).
    pub fn new(num_threads: usize) -> io::Result<Self> {
        let (tx, rx): (Sender<Job>, _) = unbounded();
        let num_threads = num_threads.max(1);
        let mut handles = Vec::with_capacity(num_threads);

        for worker_id in 0..num_threads {
            let rx = rx.clone();

            let handle = thread::Builder::new()
                .name(format!("tapdeck-worker-{}", worker_id))
                .spawn(move || {
                    debug!("Worker {} started", worker_id);

                    while let Ok(job) = rx.recv() {
                        job();
                    }

                    debug!("Worker {} stopped", worker_id);
                })?;

            handles.push(handle);
        }

        debug!("Workers initialized: {} threads", num_threads);

        Ok(Self {
            sender: tx,
            _handles: handles,
        })
    }

    /// Execute closure on a worker thread. No return value.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.sender.send(Box::new(f)) {
            error!("Failed to enqueue job: {}", e);
        }
    }

    /// Number of worker threads
    pub fn len(&self) -> usize {
        self._handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self._handles.is_empty()
    }
}

// Sender drops → channel closes → workers exit recv() loop
impl Drop for Workers {
    fn drop(&mut self) {
        debug!("Workers shutting down ({} threads)...", self._handles.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::bounded;
    use std::time::Duration;

    #[test]
    fn test_execute_runs_job() {
        let workers = Workers::new(2).unwrap();
        assert_eq!(workers.len(), 2);

        let (tx, rx) = bounded(1);
        workers.execute(move || {
            tx.send(42).unwrap();
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(42));
    }

    #[test]
    fn test_zero_threads_clamped_to_one() {
        let workers = Workers::new(0).unwrap();
        assert_eq!(workers.len(), 1);
    }
}
