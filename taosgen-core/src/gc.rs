//! Background garbage collector: a bounded queue of destruction closures
//! drained by a fixed worker pool, so freeing large `TableBlock` buffers
//! never stalls a producer or consumer thread (`spec.md` §5, design note
//! on deferred deallocation).

use crossbeam_channel::{bounded, Sender};
use log::{debug, error};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct GarbageCollector {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl GarbageCollector {
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity.max(1));
        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let rx = rx.clone();
            workers.push(
                std::thread::Builder::new()
                    .name(format!("taosgen-gc-{id}"))
                    .spawn(move || {
                        while let Ok(job) = rx.recv() {
                            job();
                        }
                        debug!("gc worker {id} exiting: queue closed");
                    })
                    .expect("failed to spawn garbage collector worker thread"),
            );
        }
        Self { tx, workers }
    }

    /// Hand off a destruction closure. Never blocks the caller indefinitely
    /// under normal load; if the queue is momentarily full this call blocks
    /// until a worker drains it, matching the bounded backpressure used
    /// elsewhere in the pipeline.
    pub fn dispose<T: Send + 'static>(&self, value: T) {
        let job: Job = Box::new(move || drop(value));
        if self.tx.send(job).is_err() {
            error!("garbage collector queue is closed; dropping value inline");
        }
    }

    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Closes the queue and waits for every worker to drain it and exit.
    pub fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn disposed_values_are_dropped() {
        let dropped = Arc::new(AtomicUsize::new(0));
        struct Counted(Arc<AtomicUsize>);
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let gc = GarbageCollector::new(2, 16);
        for _ in 0..10 {
            gc.dispose(Counted(dropped.clone()));
        }
        gc.shutdown();
        assert_eq!(dropped.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn worker_count_is_clamped_to_at_least_one() {
        let gc = GarbageCollector::new(0, 4);
        assert_eq!(gc.workers.len(), 1);
        gc.shutdown();
    }
}
