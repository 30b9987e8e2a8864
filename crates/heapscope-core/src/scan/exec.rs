// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Work-stealing chunk executor.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::deadline::{Deadline, StopSignal};

/// Partial results of a chunked scan.
#[derive(Debug)]
pub struct ScanOutcome<T> {
    /// `(chunk index, result)` pairs, ascending by chunk index.
    pub parts: Vec<(usize, T)>,
    /// `false` when the deadline cut the scan short.
    pub complete: bool,
}

/// Number of chunks needed to cover `total` items.
#[must_use]
pub fn chunk_count(total: usize, chunk_size: usize) -> usize {
    total.div_ceil(chunk_size.max(1))
}

/// Worker count to use when the caller does not configure one.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Runs `f` over `[0, total)` in chunks of `chunk_size`, on up to `workers` threads.
///
/// Workers claim chunks through a shared counter. The stop signal is checked
/// before every claim; `f` may also poll it and return early. A chunk that
/// finishes while the signal is raised is kept but the outcome is marked
/// incomplete. With one worker (or one chunk) the scan runs on the calling
/// thread.
///
/// A panicking worker re-raises its panic on the calling thread.
pub fn scan_chunks<T, F>(
    total: usize,
    chunk_size: usize,
    workers: usize,
    deadline: Deadline,
    f: F,
) -> ScanOutcome<T>
where
    T: Send,
    F: Fn(Range<usize>, &StopSignal) -> T + Sync,
{
    let chunk_size = chunk_size.max(1);
    let chunks = chunk_count(total, chunk_size);
    let workers = workers.clamp(1, chunks.max(1));
    let signal = StopSignal::new(deadline);
    let next_chunk = AtomicUsize::new(0);
    let done = AtomicUsize::new(0);
    let truncated = AtomicBool::new(false);

    let worker = || {
        let mut local = Vec::new();
        loop {
            if signal.should_stop() {
                break;
            }
            let ix = next_chunk.fetch_add(1, Ordering::Relaxed);
            if ix >= chunks {
                break;
            }
            let start = ix * chunk_size;
            let end = (start + chunk_size).min(total);
            local.push((ix, f(start..end, &signal)));
            done.fetch_add(1, Ordering::Relaxed);
            if signal.is_raised() {
                truncated.store(true, Ordering::Relaxed);
            }
        }
        local
    };

    let mut parts: Vec<(usize, T)> = if workers == 1 {
        worker()
    } else {
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers).map(|_| s.spawn(&worker)).collect();
            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(local) => local,
                    Err(e) => std::panic::resume_unwind(e),
                })
                .collect()
        })
    };
    parts.sort_unstable_by_key(|(ix, _)| *ix);

    let complete = done.load(Ordering::Relaxed) == chunks && !truncated.load(Ordering::Relaxed);
    ScanOutcome { parts, complete }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn every_item_is_visited_once() {
        let total = 10_007;
        let out = scan_chunks(total, 128, 4, Deadline::NONE, |range, _| range.sum::<usize>());
        assert!(out.complete);
        assert_eq!(out.parts.len(), chunk_count(total, 128));
        let indices: Vec<usize> = out.parts.iter().map(|(ix, _)| *ix).collect();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        let sum: usize = out.parts.iter().map(|(_, s)| s).sum();
        assert_eq!(sum, (0..total).sum::<usize>());
    }

    #[test]
    fn single_worker_runs_inline() {
        let caller = std::thread::current().id();
        let out = scan_chunks(10, 3, 1, Deadline::NONE, |range, _| {
            assert_eq!(std::thread::current().id(), caller);
            range.len()
        });
        assert!(out.complete);
        assert_eq!(out.parts.iter().map(|(_, n)| n).sum::<usize>(), 10);
    }

    #[test]
    fn expired_deadline_yields_incomplete_outcome() {
        let out = scan_chunks(1000, 10, 2, Deadline::at(Instant::now()), |range, _| range.len());
        assert!(!out.complete);
        assert!(out.parts.is_empty());
    }

    #[test]
    fn raising_mid_scan_keeps_finished_chunks() {
        let out = scan_chunks(100, 10, 1, Deadline::NONE, |range, signal| {
            if range.start == 30 {
                signal.raise();
            }
            range.len()
        });
        assert!(!out.complete);
        assert_eq!(out.parts.len(), 4);
    }

    #[test]
    fn empty_input_is_complete() {
        let out = scan_chunks(0, 10, 8, Deadline::NONE, |range, _| range.len());
        assert!(out.complete);
        assert!(out.parts.is_empty());
    }
}
