use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Refresh period used by the dashboards.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls a fetch function on a fixed interval and publishes the newest
/// successful result.
///
/// Every tick spawns its own fetch, so a slow request never holds back the
/// next tick and responses may overlap. Whichever success lands last is the
/// published view. Failures are logged and leave the previous view in place
/// until a later tick succeeds. There is no backoff.
pub struct Poller<T> {
    rx: watch::Receiver<Option<T>>,
    handle: JoinHandle<()>,
}

impl<T> Poller<T>
where
    T: Send + Sync + 'static,
{
    pub fn spawn<F, Fut, E>(name: &'static str, period: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let tx = Arc::new(tx);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    debug!(poller = name, "no subscribers left, stopping");
                    break;
                }

                let request = fetch();
                let tx = Arc::clone(&tx);
                tokio::spawn(async move {
                    match request.await {
                        Ok(value) => {
                            tx.send_replace(Some(value));
                        }
                        Err(e) => {
                            warn!(poller = name, error = %e, "poll failed, keeping previous view");
                        }
                    }
                });
            }
        });

        Self { rx, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.rx.clone()
    }

    /// Wait until a fetch succeeds after the last observed value.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl<T: Clone> Poller<T> {
    /// The most recent successful result, if any poll has succeeded yet.
    pub fn current(&self) -> Option<T> {
        self.rx.borrow().clone()
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
