//! Cancellable periodic background tasks.
//!
//! Autosave and TTL sweeps run on dedicated threads owned by a
//! [`PeriodicTask`]. The thread sleeps on a condvar between ticks so that
//! stopping wakes it immediately.
//!
//! Tick bodies receive a [`StopToken`]. A tick that needs a lock shared with
//! the owner must re-check the token after acquiring it: `stop()` is called
//! while holding that lock, so a tick that observes `is_stopped() == false`
//! under the lock is guaranteed to run before `stop()` returned.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a tick asks the task loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    /// Schedule another tick.
    Continue,
    /// End the task.
    Stop,
}

#[derive(Debug, Default)]
struct Shared {
    stopped: Mutex<bool>,
    wake: Condvar,
    ticks: AtomicU64,
}

/// Cancellation token handed to every tick.
#[derive(Debug, Clone)]
pub struct StopToken {
    shared: Arc<Shared>,
}

impl StopToken {
    /// Returns true once the owning task has been stopped.
    pub fn is_stopped(&self) -> bool {
        *self.shared.stopped.lock()
    }
}

/// A background thread running a closure at a fixed interval.
pub struct PeriodicTask {
    name: String,
    interval: Duration,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    /// Spawns a task whose first tick runs one `interval` from now.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the thread cannot be spawned.
    pub fn spawn<F>(name: impl Into<String>, interval: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut(&StopToken) -> TaskControl + Send + 'static,
    {
        let name = name.into();
        let shared = Arc::new(Shared::default());
        let token = StopToken {
            shared: Arc::clone(&shared),
        };
        let thread_name = name.clone();

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            debug!(task = %thread_name, ?interval, "periodic task started");
            loop {
                let deadline = Instant::now() + interval;
                {
                    let mut stopped = token.shared.stopped.lock();
                    while !*stopped {
                        if token.shared.wake.wait_until(&mut stopped, deadline).timed_out() {
                            break;
                        }
                    }
                    if *stopped {
                        break;
                    }
                }
                token.shared.ticks.fetch_add(1, Ordering::Relaxed);
                if tick(&token) == TaskControl::Stop {
                    break;
                }
            }
            debug!(task = %thread_name, "periodic task finished");
        })?;

        Ok(Self {
            name,
            interval,
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the number of ticks started so far.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        *self.shared.stopped.lock()
    }

    /// Signals the task to stop without waiting for the thread.
    pub fn stop(&self) {
        let mut stopped = self.shared.stopped.lock();
        if !*stopped {
            *stopped = true;
            self.shared.wake.notify_all();
        }
    }

    /// Signals the task and waits for its thread to exit.
    ///
    /// Must not be called while holding a lock a tick might wait on.
    /// Calling it from the task's own thread only signals.
    pub fn stop_and_join(&self) {
        self.stop();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == current_thread() {
                return;
            }
            if handle.join().is_err() {
                warn!(task = %self.name, "periodic task panicked");
            }
        }
    }
}

fn current_thread() -> ThreadId {
    thread::current().id()
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("ticks", &self.ticks())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let task = PeriodicTask::spawn("test-tick", Duration::from_millis(5), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            TaskControl::Continue
        })
        .unwrap();

        let start = Instant::now();
        while count.load(Ordering::SeqCst) < 3 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        task.stop_and_join();
        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 3);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
        assert!(task.is_stopped());
    }

    #[test]
    fn stop_wakes_long_sleep() {
        let task = PeriodicTask::spawn("test-sleep", Duration::from_secs(3600), |_| {
            TaskControl::Continue
        })
        .unwrap();
        let start = Instant::now();
        task.stop_and_join();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(task.ticks(), 0);
    }

    #[test]
    fn tick_can_end_task() {
        let task = PeriodicTask::spawn("test-once", Duration::from_millis(1), |_| TaskControl::Stop)
            .unwrap();
        let start = Instant::now();
        while task.ticks() == 0 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(2));
        }
        task.stop_and_join();
        assert_eq!(task.ticks(), 1);
    }

    #[test]
    fn token_reports_stop() {
        let seen = Arc::new(Mutex::new(None::<StopToken>));
        let s = Arc::clone(&seen);
        let task = PeriodicTask::spawn("test-token", Duration::from_millis(1), move |token| {
            *s.lock() = Some(token.clone());
            TaskControl::Stop
        })
        .unwrap();
        let start = Instant::now();
        while seen.lock().is_none() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(2));
        }
        task.stop();
        let token = seen.lock().clone().unwrap();
        assert!(token.is_stopped());
    }
}
