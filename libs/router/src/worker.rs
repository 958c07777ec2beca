//! Single event worker
//!
//! Every inbound event batch, every per-service dispatch and every timer
//! expiry runs on one worker that drains an unbounded queue, so a response
//! and the timeout for the same request are never handled concurrently.
//!
//! The loop runs on tokio's blocking pool because feature services may
//! call back into the router (and so into blocking channel calls) while
//! handling events. Timers are tokio tasks that enqueue their job when
//! they fire.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};
use vhal_client::{EventSink, HalEvent};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub(crate) enum WorkItem {
    Event(HalEvent),
    Job(Job),
    Shutdown,
}

/// Cloneable sender side of the worker queue
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::UnboundedSender<WorkItem>,
    runtime: Handle,
}

/// Receiving side; consumed when the loop starts
pub struct WorkerQueue {
    rx: mpsc::UnboundedReceiver<WorkItem>,
}

/// Create a worker whose timers run on `runtime`
pub fn worker(runtime: Handle) -> (WorkerHandle, WorkerQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (WorkerHandle { tx, runtime }, WorkerQueue { rx })
}

impl WorkerHandle {
    /// Run `job` on the worker. Returns false once the worker has stopped.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(WorkItem::Job(Box::new(job))).is_ok()
    }

    /// Run `job` on the worker after `delay` unless cancelled first
    pub fn post_delayed(
        &self,
        delay: Duration,
        job: impl FnOnce() + Send + 'static,
    ) -> DelayedTask {
        let tx = self.tx.clone();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(WorkItem::Job(Box::new(job))).is_err() {
                trace!("Timer fired after worker shutdown");
            }
        });
        DelayedTask { handle }
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Stop the loop after the items already queued
    pub fn shutdown(&self) {
        let _ = self.tx.send(WorkItem::Shutdown);
    }
}

impl EventSink for WorkerHandle {
    fn post_event(&self, event: HalEvent) {
        if self.tx.send(WorkItem::Event(event)).is_err() {
            debug!("Dropping event batch, worker stopped");
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl WorkerQueue {
    /// Start draining the queue; `on_event` handles event batches and jobs
    /// run inline
    pub fn spawn(
        self,
        runtime: &Handle,
        mut on_event: impl FnMut(HalEvent) + Send + 'static,
    ) -> JoinHandle<()> {
        let mut rx = self.rx;
        runtime.spawn_blocking(move || {
            while let Some(item) = rx.blocking_recv() {
                match item {
                    WorkItem::Event(event) => on_event(event),
                    WorkItem::Job(job) => job(),
                    WorkItem::Shutdown => break,
                }
            }
            debug!("Event worker stopped");
        })
    }
}

/// A pending timer; cancelling after it fired is harmless
#[derive(Debug)]
pub struct DelayedTask {
    handle: JoinHandle<()>,
}

impl DelayedTask {
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::sync::oneshot;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_jobs_and_events_run_in_order() {
        let (handle, queue) = worker(Handle::current());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let events = seen.clone();
        queue.spawn(&Handle::current(), move |event| {
            if let HalEvent::PropertyEvents(values) = event {
                events.lock().push(format!("event:{}", values.len()));
            }
        });

        let jobs = seen.clone();
        handle.post(move || jobs.lock().push("job".to_string()));
        handle.post_event(HalEvent::PropertyEvents(vec![]));
        let (tx, rx) = oneshot::channel();
        handle.post(move || {
            let _ = tx.send(());
        });
        rx.await.unwrap();

        assert_eq!(*seen.lock(), vec!["job".to_string(), "event:0".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_delayed_job_fires_after_delay() {
        let (handle, queue) = worker(Handle::current());
        queue.spawn(&Handle::current(), |_| {});

        let started = Instant::now();
        let (tx, rx) = oneshot::channel();
        let _timer = handle.post_delayed(Duration::from_millis(40), move || {
            let _ = tx.send(Instant::now());
        });
        let fired = rx.await.unwrap();
        assert!(fired.duration_since(started) >= Duration::from_millis(40));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_timer_never_runs() {
        let (handle, queue) = worker(Handle::current());
        queue.spawn(&Handle::current(), |_| {});

        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        let timer = handle.post_delayed(Duration::from_millis(20), move || *flag.lock() = true);
        timer.cancel();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!*fired.lock());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_post_after_shutdown_reports_failure() {
        let (handle, queue) = worker(Handle::current());
        let join = queue.spawn(&Handle::current(), |_| {});
        handle.shutdown();
        join.await.unwrap();
        assert!(!handle.post(|| {}));
    }
}
