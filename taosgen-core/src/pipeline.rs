//! `DataPipeline<T>`: bounded multi-producer/multi-consumer queues with
//! termination and timeout signals (`spec.md` §4.4).

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_millis(100);

pub enum FetchResult<T> {
    Item(T),
    Timeout,
    Terminated,
}

/// Wire type carried on the underlying channel: a real item, or a poison
/// pill injected by `terminate()`. Kept internal so `push`/`fetch` still
/// speak `T`/`FetchResult<T>` to callers.
enum Slot<T> {
    Item(T),
    Terminate,
}

/// Either one queue shared by every producer/consumer, or one queue per
/// producer feeding all consumers — selected at construction by
/// `shared_queue`.
enum Topology<T> {
    Shared {
        tx: Sender<Slot<T>>,
        rx: Receiver<Slot<T>>,
    },
    PerProducer {
        senders: Vec<Sender<Slot<T>>>,
        receivers: Vec<Receiver<Slot<T>>>,
        next_consumer: std::sync::atomic::AtomicUsize,
    },
}

pub struct DataPipeline<T> {
    topology: Topology<T>,
    terminated: std::sync::atomic::AtomicBool,
    consumer_count: usize,
}

impl<T: Send> DataPipeline<T> {
    pub fn new_shared(capacity: usize, consumer_count: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            topology: Topology::Shared { tx, rx },
            terminated: std::sync::atomic::AtomicBool::new(false),
            consumer_count,
        }
    }

    pub fn new_per_producer(producer_count: usize, capacity_per_producer: usize, consumer_count: usize) -> Self {
        let mut senders = Vec::with_capacity(producer_count);
        let mut receivers = Vec::with_capacity(producer_count);
        for _ in 0..producer_count {
            let (tx, rx) = bounded(capacity_per_producer.max(1));
            senders.push(tx);
            receivers.push(rx);
        }
        Self {
            topology: Topology::PerProducer {
                senders,
                receivers,
                next_consumer: std::sync::atomic::AtomicUsize::new(0),
            },
            terminated: std::sync::atomic::AtomicBool::new(false),
            consumer_count,
        }
    }

    /// Blocks if the owning queue is at capacity. Fails if `terminate()` has
    /// been called.
    pub fn push(&self, producer_id: usize, item: T) -> Result<(), crate::error::PipelineError> {
        if self.terminated.load(std::sync::atomic::Ordering::Acquire) {
            return Err(crate::error::PipelineError::Terminated);
        }
        match &self.topology {
            Topology::Shared { tx, .. } => tx
                .send(Slot::Item(item))
                .map_err(|_| crate::error::PipelineError::Terminated),
            Topology::PerProducer { senders, .. } => senders[producer_id % senders.len()]
                .send(Slot::Item(item))
                .map_err(|_| crate::error::PipelineError::Terminated),
        }
    }

    pub fn fetch(&self, consumer_id: usize) -> FetchResult<T> {
        match &self.topology {
            Topology::Shared { rx, .. } => match rx.recv_timeout(FETCH_TIMEOUT) {
                Ok(Slot::Item(item)) => FetchResult::Item(item),
                Ok(Slot::Terminate) => FetchResult::Terminated,
                Err(RecvTimeoutError::Timeout) => FetchResult::Timeout,
                Err(RecvTimeoutError::Disconnected) => FetchResult::Terminated,
            },
            Topology::PerProducer { receivers, .. } => {
                // A consumer fetching from a per-producer topology round
                // robins over every producer queue so it sees all streams.
                let start = consumer_id % receivers.len();
                for offset in 0..receivers.len() {
                    let idx = (start + offset) % receivers.len();
                    match receivers[idx].try_recv() {
                        Ok(Slot::Item(item)) => return FetchResult::Item(item),
                        Ok(Slot::Terminate) => return FetchResult::Terminated,
                        Err(_) => {}
                    }
                }
                // Nothing ready anywhere; do one blocking wait on our
                // "home" queue so we don't spin.
                match receivers[start].recv_timeout(FETCH_TIMEOUT) {
                    Ok(Slot::Item(item)) => FetchResult::Item(item),
                    Ok(Slot::Terminate) => FetchResult::Terminated,
                    Err(RecvTimeoutError::Timeout) => FetchResult::Timeout,
                    Err(RecvTimeoutError::Disconnected) => FetchResult::Terminated,
                }
            }
        }
    }

    /// Flips the terminated flag so `push` fails fast, then injects one
    /// `Slot::Terminate` sentinel per consumer so every `fetch` loop — even
    /// one currently blocked in `recv_timeout` — observes `Terminated`
    /// within one more poll, the same sentinel-per-consumer pattern the
    /// garbage collector uses to retire its workers (`spec.md` §5).
    pub fn terminate(&self) {
        self.terminated.store(true, std::sync::atomic::Ordering::Release);
        match &self.topology {
            Topology::Shared { tx, .. } => {
                for _ in 0..self.consumer_count.max(1) {
                    let _ = tx.send(Slot::Terminate);
                }
            }
            Topology::PerProducer { senders, .. } => {
                for i in 0..self.consumer_count.max(1) {
                    let _ = senders[i % senders.len()].send(Slot::Terminate);
                }
            }
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn total_queued(&self) -> usize {
        match &self.topology {
            Topology::Shared { tx, .. } => tx.len(),
            Topology::PerProducer { senders, .. } => senders.iter().map(|s| s.len()).sum(),
        }
    }

    pub fn capacity(&self) -> usize {
        match &self.topology {
            Topology::Shared { tx, .. } => tx.capacity().unwrap_or(0),
            Topology::PerProducer { senders, .. } => senders.iter().filter_map(|s| s.capacity()).sum(),
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.consumer_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_within_one_producer() {
        let pipeline: DataPipeline<i32> = DataPipeline::new_shared(10, 1);
        for i in 0..5 {
            pipeline.push(0, i).unwrap();
        }
        for expected in 0..5 {
            match pipeline.fetch(0) {
                FetchResult::Item(v) => assert_eq!(v, expected),
                _ => panic!("expected an item"),
            }
        }
    }

    #[test]
    fn fetch_times_out_when_empty() {
        let pipeline: DataPipeline<i32> = DataPipeline::new_shared(10, 1);
        match pipeline.fetch(0) {
            FetchResult::Timeout => {}
            _ => panic!("expected timeout"),
        }
    }

    #[test]
    fn push_after_terminate_fails() {
        let pipeline: DataPipeline<i32> = DataPipeline::new_shared(10, 1);
        pipeline.terminate();
        assert!(pipeline.push(0, 1).is_err());
    }

    #[test]
    fn terminate_unblocks_fetch_into_terminated() {
        let pipeline: DataPipeline<i32> = DataPipeline::new_shared(10, 1);
        pipeline.terminate();
        match pipeline.fetch(0) {
            FetchResult::Terminated => {}
            _ => panic!("expected fetch to observe termination"),
        }
    }

    #[test]
    fn terminate_unblocks_every_consumer_in_per_producer_topology() {
        let pipeline: DataPipeline<i32> = DataPipeline::new_per_producer(2, 10, 3);
        pipeline.terminate();
        for consumer_id in 0..3 {
            match pipeline.fetch(consumer_id) {
                FetchResult::Terminated => {}
                _ => panic!("expected consumer {consumer_id} to observe termination"),
            }
        }
    }

    #[test]
    fn total_queued_tracks_pushes() {
        let pipeline: DataPipeline<i32> = DataPipeline::new_shared(10, 1);
        pipeline.push(0, 1).unwrap();
        pipeline.push(0, 2).unwrap();
        assert_eq!(pipeline.total_queued(), 2);
    }
}
