use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// A repeating fetch task tied to the lifetime of its owner.
///
/// The owning page controller performs its own initial fetch on mount, so the
/// first tick fires one full period after spawn. Dropping the `Poller` aborts
/// the task, which is what guarantees no further state writes after unmount.
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                tick().await;
            }
        });
        Poller { handle }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
