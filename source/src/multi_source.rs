use crate::message_source::Source;
use async_trait::async_trait;
use eventbridge_common::{Error, Result, SourceMessagePair};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One child source, run on its own task so that a long-poll `get_message`
/// await on one child can never block the others — the threaded-worker
/// alternative to cooperative suspension that §9 explicitly sanctions
/// ("replace with blocking calls on a worker per source plus a bounded
/// channel feeding the pump").
struct Worker {
    rx: mpsc::Receiver<Result<SourceMessagePair>>,
    closed: Arc<AtomicBool>,
    cancellation: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

/// N-way fair merge of [`Source`]s into one pull interface (§4.3).
pub struct MultiSource {
    pending_children: Vec<Box<dyn Source>>,
    workers: Vec<Worker>,
    cursor: usize,
    closed: bool,
}

impl MultiSource {
    pub fn new(children: Vec<Box<dyn Source>>) -> Self {
        Self {
            pending_children: children,
            workers: Vec::new(),
            cursor: 0,
            closed: false,
        }
    }
}

async fn run_worker(
    mut child: Box<dyn Source>,
    tx: mpsc::Sender<Result<SourceMessagePair>>,
    closed: Arc<AtomicBool>,
    cancellation: CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            result = child.get_message() => {
                match result {
                    Ok(pair) => {
                        if tx.send(Ok(pair)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) if err.is_cancelled() => break,
                    Err(err) => {
                        let _ = tx.send(Err(err)).await;
                        break;
                    }
                }
            }
        }
    }

    closed.store(true, Ordering::Relaxed);
    child.close().await
}

#[async_trait]
impl Source for MultiSource {
    async fn open(&mut self) -> Result<()> {
        let mut children = std::mem::take(&mut self.pending_children);

        let results = futures::future::join_all(children.iter_mut().map(|c| c.open())).await;

        if results.iter().any(Result::is_err) {
            for (child, result) in children.iter_mut().zip(results.iter()) {
                if result.is_ok() {
                    let _ = child.close().await;
                }
            }
            let first_err = results.into_iter().find_map(|r| r.err()).unwrap();
            return Err(first_err);
        }

        for child in children {
            let (tx, rx) = mpsc::channel(1);
            let closed = Arc::new(AtomicBool::new(false));
            let cancellation = CancellationToken::new();

            let handle = tokio::spawn(run_worker(child, tx, closed.clone(), cancellation.clone()));

            self.workers.push(Worker {
                rx,
                closed,
                cancellation,
                handle,
            });
        }

        self.closed = false;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        for worker in &self.workers {
            worker.cancellation.cancel();
        }

        let mut first_err = None;
        for worker in self.workers.drain(..) {
            match worker.handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "error closing child source");
                    first_err.get_or_insert(err);
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "child source worker panicked");
                }
            }
        }

        self.closed = true;

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn closed(&self) -> bool {
        self.closed
    }

    /// True iff some child has a buffered message ready without suspending
    /// — derived from live channel occupancy, not a latch, so it reflects
    /// the current state of the buffer rather than "ever had a message".
    fn has_pending_messages(&self) -> bool {
        self.workers.iter().any(|w| w.rx.len() > 0)
    }

    async fn get_message(&mut self) -> Result<SourceMessagePair> {
        let n = self.workers.len();
        if n == 0 {
            return Err(Error::Cancelled);
        }

        loop {
            // Fast path: round-robin scan for a child that already has a
            // message buffered, starting from the rotating cursor so no
            // single child can starve the others (P6).
            for offset in 0..n {
                let idx = (self.cursor + offset) % n;
                if let Ok(result) = self.workers[idx].rx.try_recv() {
                    self.cursor = (idx + 1) % n;
                    return result;
                }
            }

            if self.workers.iter().all(|w| w.closed.load(Ordering::Relaxed)) {
                return Err(Error::Cancelled);
            }

            // Slow path: nothing ready yet. Wait on every still-open child
            // concurrently (closed children are excluded so their
            // already-resolved `recv` doesn't spin the loop). Once a child
            // wakes, the fast path above resumes rotation from it.
            let live: Vec<_> = self
                .workers
                .iter_mut()
                .filter(|w| !w.closed.load(Ordering::Relaxed))
                .collect();
            let live_indices: Vec<usize> = (0..n)
                .filter(|&i| !self.workers[i].closed.load(Ordering::Relaxed))
                .collect();

            let futs = live.into_iter().map(|w| {
                Box::pin(async move { w.rx.recv().await })
                    as std::pin::Pin<Box<dyn std::future::Future<Output = Option<Result<SourceMessagePair>>> + Send + '_>>
            });

            let (outcome, pos, _rest) = futures::future::select_all(futs).await;
            let idx = live_indices[pos];

            match outcome {
                Some(result) => {
                    self.cursor = (idx + 1) % n;
                    return result;
                }
                None => {
                    // That child's worker has exited (closed); loop to
                    // re-check the rest or fall through to the all-closed
                    // check above.
                    continue;
                }
            }
        }
    }
}
