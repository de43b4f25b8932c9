//! Worker pool with in-order commit.
//!
//! A feeder thread pushes item indices into a bounded job queue; `workers`
//! threads pull indices, run the (parallel, order-insensitive) preparation
//! step and send `(index, result)` back through a bounded result queue. The
//! calling thread is the only committer: it buffers early results in a
//! [`ReorderBuffer`] and commits them strictly by index.
//!
//! Both queues hold `2 * workers` messages, so a slow committer throttles the
//! workers instead of letting results pile up.

mod reorder;
pub use reorder::ReorderBuffer;

use crate::{ArchiverError, Result};

use crossbeam_channel::{bounded, Receiver};
use std::thread;

/// Prepares every item of `items` in parallel and commits the results in index order.
///
/// `commit` runs on the calling thread, one call at a time. The first error it
/// returns stops the pipeline: no later result is committed, and workers exit
/// at their next send. Every item is prepared at most once.
pub fn run_ordered<T, R, P, C>(items: &[T], workers: usize, prepare: P, mut commit: C) -> Result<()>
where
    T: Sync,
    R: Send,
    P: Fn(&T) -> R + Sync,
    C: FnMut(R) -> Result<()>,
{
    let total = items.len();
    if total == 0 {
        return Ok(());
    }
    let workers = workers.clamp(1, total);
    let (job_tx, job_rx) = bounded::<usize>(2 * workers);
    let (result_tx, result_rx) = bounded::<(usize, R)>(2 * workers);

    thread::scope(|s| {
        let prepare = &prepare;
        let mut handles = Vec::with_capacity(workers + 1);

        // --- Preparation workers ---
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            handles.push(s.spawn(move || {
                for idx in job_rx {
                    if result_tx.send((idx, prepare(&items[idx]))).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(job_rx);
        drop(result_tx);

        // --- Feeder ---
        handles.push(s.spawn(move || {
            for idx in 0..total {
                if job_tx.send(idx).is_err() {
                    break;
                }
            }
        }));

        // --- Committer (this thread) ---
        let outcome = commit_in_order(result_rx, total, &mut commit);

        let mut panicked = false;
        for handle in handles {
            panicked |= handle.join().is_err();
        }
        if panicked {
            return Err(ArchiverError::WorkerPanicked);
        }
        outcome
    })
}

/// Drains `results`, committing in index order until all `total` items are done.
/// `results` is dropped on return, which unblocks any worker waiting to send.
fn commit_in_order<R, C>(results: Receiver<(usize, R)>, total: usize, commit: &mut C) -> Result<()>
where
    C: FnMut(R) -> Result<()>,
{
    let mut pending = ReorderBuffer::new();
    for (idx, item) in results.iter() {
        if !pending.insert(idx, item) {
            tracing::warn!("dropping duplicate result for item #{idx}");
            continue;
        }
        while let Some(ready) = pending.pop_next() {
            commit(ready)?;
        }
        if pending.next_seq() == total {
            return Ok(());
        }
    }
    tracing::warn!(
        "result stream closed at item #{} with {} later results still held",
        pending.next_seq(),
        pending.held()
    );
    Err(ArchiverError::MissingEntry { seq: pending.next_seq() })
}
