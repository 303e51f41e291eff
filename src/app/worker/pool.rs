//! Bounded worker pool
//!
//! A fixed number of workers pull tasks from a bounded queue and run them
//! one at a time. Admission is gated by a semaphore holding one permit per
//! worker: [`WorkerPool::submit`] waits for a permit, and the permit travels
//! with the task until it finishes. Once `capacity` tasks are queued or
//! executing, the next submission waits until one of them completes.
//!
//! Tasks report their own outcomes. The pool neither retries nor inspects
//! them; a panicking task is logged and its worker keeps running.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{mpsc, watch, Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info};

use super::config::WorkerConfig;
use crate::app::barrier::CompletionBarrier;
use crate::errors::{PoolError, PoolResult};

/// Unit of work accepted by the pool
pub type Task = BoxFuture<'static, ()>;

struct QueuedTask {
    task: Task,
    permit: OwnedSemaphorePermit,
}

type SharedReceiver = Arc<Mutex<mpsc::Receiver<QueuedTask>>>;

/// Fixed-capacity concurrent task executor
///
/// `close` consumes the pool, so no submission can follow it.
#[derive(Debug)]
pub struct WorkerPool {
    capacity: usize,
    sender: mpsc::Sender<QueuedTask>,
    admission: Arc<Semaphore>,
    active: Arc<watch::Sender<usize>>,
    workers_done: Arc<CompletionBarrier>,
}

impl WorkerPool {
    /// Starts `capacity` workers on the current tokio runtime
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidCapacity` if `capacity` is zero
    pub fn new(capacity: usize) -> PoolResult<Self> {
        if capacity == 0 {
            return Err(PoolError::InvalidCapacity { capacity });
        }

        let (sender, receiver) = mpsc::channel(capacity);
        let receiver: SharedReceiver = Arc::new(Mutex::new(receiver));
        let (active, _) = watch::channel(0usize);
        let active = Arc::new(active);
        let workers_done = Arc::new(CompletionBarrier::new(capacity));

        for worker_id in 0..capacity {
            tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&receiver),
                Arc::clone(&active),
                Arc::clone(&workers_done),
            ));
        }

        info!("Worker pool started with {} workers", capacity);

        Ok(Self {
            capacity,
            sender,
            admission: Arc::new(Semaphore::new(capacity)),
            active,
            workers_done,
        })
    }

    /// Starts a pool sized by `config`
    pub fn from_config(config: &WorkerConfig) -> PoolResult<Self> {
        config.validate()?;
        Self::new(config.worker_count)
    }

    /// Queues `task`, waiting while `capacity` tasks are already in flight
    pub async fn submit<F>(&self, task: F) -> PoolResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = Arc::clone(&self.admission)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        self.active.send_modify(|active| *active += 1);

        let queued = QueuedTask {
            task: task.boxed(),
            permit,
        };
        if self.sender.send(queued).await.is_err() {
            self.active.send_modify(|active| *active -= 1);
            return Err(PoolError::Closed);
        }

        Ok(())
    }

    /// Tasks queued or executing
    pub fn active_count(&self) -> usize {
        *self.active.borrow()
    }

    /// Number of workers, which is also the admission limit
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits until no task is queued or executing
    ///
    /// The pool stays open; more work may be submitted afterwards.
    pub async fn wait_idle(&self) {
        let mut receiver = self.active.subscribe();
        let _ = receiver.wait_for(|active| *active == 0).await;
    }

    /// Stops accepting work, waits for every submitted task to finish and
    /// for all workers to exit
    pub async fn close(self) {
        let Self {
            sender,
            workers_done,
            ..
        } = self;

        drop(sender);
        workers_done.wait().await;
        info!("Worker pool closed");
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: SharedReceiver,
    active: Arc<watch::Sender<usize>>,
    workers_done: Arc<CompletionBarrier>,
) {
    debug!(worker_id, "Worker started");

    loop {
        let next = {
            let mut queue = receiver.lock().await;
            queue.recv().await
        };
        let Some(QueuedTask { task, permit }) = next else {
            break;
        };

        if AssertUnwindSafe(task).catch_unwind().await.is_err() {
            error!(worker_id, "Task panicked; worker continues");
        }

        // Decrement before releasing the permit so the count never exceeds capacity
        active.send_modify(|count| *count -= 1);
        drop(permit);
    }

    debug!(worker_id, "Worker exiting");
    workers_done.count_down();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_capacity_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(PoolError::InvalidCapacity { capacity: 0 })
        ));
    }

    #[tokio::test]
    async fn test_every_task_runs_exactly_once() {
        let pool = WorkerPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.submit(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }

        pool.close().await;
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_capacity() {
        let capacity = 3;
        let pool = WorkerPool::new(capacity).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..30 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
            assert!(pool.active_count() <= capacity);
        }

        pool.close().await;
        assert!(peak.load(Ordering::SeqCst) <= capacity);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_submit_blocks_when_full() {
        let pool = WorkerPool::new(2).unwrap();
        let gate = Arc::new(Semaphore::new(0));

        for _ in 0..2 {
            let gate = Arc::clone(&gate);
            pool.submit(async move {
                gate.acquire().await.unwrap().forget();
            })
            .await
            .unwrap();
        }

        let blocked = tokio::time::timeout(Duration::from_millis(100), pool.submit(async {})).await;
        assert!(blocked.is_err(), "third submit should wait for a free slot");

        gate.add_permits(1);
        tokio::time::timeout(Duration::from_secs(5), pool.submit(async {}))
            .await
            .expect("submit should proceed once a task finishes")
            .unwrap();

        gate.add_permits(1);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_stop_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        pool.submit(async { panic!("task failure") }).await.unwrap();
        let ran_clone = Arc::clone(&ran);
        pool.submit(async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

        pool.close().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_idle_keeps_pool_open() {
        let pool = WorkerPool::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            pool.submit(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }
        pool.wait_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(pool.active_count(), 0);

        pool.submit(async {}).await.unwrap();
        pool.close().await;
    }
}
