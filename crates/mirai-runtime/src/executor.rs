//! Worker pool for pooled subscription callbacks.

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, trace, warn};

/// A unit of work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Anything that runs submitted closures, eventually and off the caller's
/// thread.
pub trait Executor: Send + Sync {
    fn submit(&self, job: Job);
}

/// Fixed-size pool of OS threads sharing one FIFO queue.
///
/// Jobs start in submission order but may finish in any order when there is
/// more than one worker. Dropping the pool stops intake, lets the workers
/// drain everything already queued and joins them.
pub struct ThreadPool {
    sender: Option<UnboundedSender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Starts `size` workers (at least one).
    pub fn new(size: usize) -> io::Result<Self> {
        let size = size.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|index| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("mirai-worker-{index}"))
                    .spawn(move || worker_loop(index, &receiver))
            })
            .collect::<io::Result<Vec<_>>>()?;

        debug!(size, "Worker pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(index: usize, receiver: &Mutex<UnboundedReceiver<Job>>) {
    loop {
        // The lock is released before the job runs.
        let Some(job) = receiver.lock().blocking_recv() else {
            break;
        };
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(worker = index, "Pooled job panicked");
        }
    }
    trace!(worker = index, "Worker exiting");
}

impl Executor for ThreadPool {
    fn submit(&self, job: Job) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(job).is_err() {
            warn!("Worker pool is gone, dropping job");
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.sender.take();
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            // A pool dropped from one of its own jobs cannot join that worker.
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                error!("Worker thread panicked");
            }
        }
        debug!("Worker pool stopped");
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("size", &self.workers.len())
            .field("open", &self.sender.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_runs_jobs() {
        let pool = ThreadPool::new(3).unwrap();
        assert_eq!(pool.size(), 3);
        let (tx, rx) = std::sync::mpsc::channel();
        for i in 0..10 {
            let tx = tx.clone();
            pool.submit(Box::new(move || tx.send(i).unwrap()));
        }
        let mut seen: Vec<i32> = (0..10)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_drop_drains_queue() {
        let done = Arc::new(AtomicUsize::new(0));
        let pool = ThreadPool::new(1).unwrap();
        for _ in 0..20 {
            let done = done.clone();
            pool.submit(Box::new(move || {
                thread::sleep(Duration::from_millis(2));
                done.fetch_add(1, Ordering::SeqCst);
            }));
        }
        drop(pool);
        assert_eq!(done.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_panicking_job_keeps_worker() {
        let pool = ThreadPool::new(1).unwrap();
        pool.submit(Box::new(|| panic!("job failure")));
        let (tx, rx) = std::sync::mpsc::channel();
        pool.submit(Box::new(move || tx.send(()).unwrap()));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_zero_size_is_one_worker() {
        assert_eq!(ThreadPool::new(0).unwrap().size(), 1);
    }
}
