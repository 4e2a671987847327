//! Bounded invocation of untrusted decision logic.
//!
//! Every referee-to-player call goes through [`invoke`], so a single slow or
//! crashing player loses only that call's outcome, never the game.

use log::warn;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Runs `computation` on a dedicated worker thread, waiting at most
/// `deadline` for its result.
///
/// Returns `None` in three unified cases: the computation panicked, it did
/// not finish before the deadline, or its worker could not be started. The
/// referee thread always resumes once the deadline elapses.
///
/// A worker that outlives the deadline is detached, never awaited. Its send
/// fails once the receiving side is dropped, and the thread's resources are
/// reclaimed when it eventually finishes.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use trains_engine::harness::invoke;
///
/// assert_eq!(invoke(Duration::from_secs(1), || 2 + 2), Some(4));
/// assert_eq!(
///     invoke(Duration::from_millis(10), || {
///         std::thread::sleep(Duration::from_secs(60));
///     }),
///     None::<()>
/// );
/// ```
pub fn invoke<T, F>(deadline: Duration, computation: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);

    let spawned = thread::Builder::new()
        .name(String::from("player-call"))
        .spawn(move || {
            if let Ok(value) = panic::catch_unwind(AssertUnwindSafe(computation)) {
                // The referee may have given up already; a dropped receiver
                // just means the result is discarded.
                let _ = sender.send(value);
            }
        });

    if let Err(e) = spawned {
        warn!("Could not start a player-call worker: {}.", e);
        return None;
    }

    match receiver.recv_timeout(deadline) {
        Ok(value) => Some(value),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(
                "A player call did not complete within {:?}; abandoning it.",
                deadline
            );
            None
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            warn!("A player call panicked; treating it as no response.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    const LONG_DEADLINE: Duration = Duration::from_secs(5);
    const SHORT_DEADLINE: Duration = Duration::from_millis(50);

    #[test]
    fn fast_computation_yields_its_value() {
        assert_eq!(invoke(LONG_DEADLINE, || 41 + 1), Some(42));
        assert_eq!(
            invoke(LONG_DEADLINE, || String::from("done")),
            Some(String::from("done"))
        );
    }

    #[test]
    fn slow_computation_yields_none() {
        let start = Instant::now();
        let result: Option<u32> = invoke(SHORT_DEADLINE, || {
            thread::sleep(Duration::from_secs(60));
            7
        });

        assert_eq!(result, None);
        // The caller resumed at the deadline, not after the sleep.
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn panicking_computation_yields_none() {
        let result: Option<u32> = invoke(LONG_DEADLINE, || panic!("misbehaving player"));
        assert_eq!(result, None);
    }

    #[test]
    fn completion_strictly_before_deadline_always_wins() {
        for _ in 0..10 {
            assert_eq!(invoke(LONG_DEADLINE, || 3), Some(3));
        }
    }

    #[test]
    fn abandoned_worker_cannot_deliver_late() {
        let delivered = Arc::new(AtomicBool::new(false));
        let delivered_in_worker = delivered.clone();

        let result: Option<()> = invoke(SHORT_DEADLINE, move || {
            thread::sleep(Duration::from_millis(200));
            delivered_in_worker.store(true, Ordering::SeqCst);
        });
        assert_eq!(result, None);

        // Let the detached worker run past its send attempt: the late result
        // is discarded, even though the worker itself finished.
        thread::sleep(Duration::from_millis(300));
        assert!(delivered.load(Ordering::SeqCst));
    }
}
