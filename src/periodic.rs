//! A function run on a fixed interval, on its own daemon thread.
//!
//! Spawn a thread, sleep for the interval, run the callback, repeat
//! forever. The thread is detached — there is no shutdown handshake.

use std::time::Duration;

/// Runs `task` once every `interval` on a background thread for as long as
/// the process lives.
pub struct PeriodicWorker {
    _handle: std::thread::JoinHandle<()>,
}

impl PeriodicWorker {
    pub fn new<F>(interval: Duration, mut task: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let handle = std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            task();
        });

        PeriodicWorker { _handle: handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn task_runs_repeatedly_on_its_own_thread() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let _worker = PeriodicWorker::new(Duration::from_millis(5), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(60));
        assert!(counter.load(Ordering::SeqCst) >= 2);
    }
}
