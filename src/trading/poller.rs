//! Periodic balance/position refresh tied to the wallet session.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::metrics::Metrics;
use crate::trading::desk::TradingDesk;
use crate::wallet::session::WalletSession;

#[async_trait]
pub trait Refresh: Send + Sync {
    /// Returns false when the refresh hit an error.
    async fn refresh(&self) -> bool;
}

#[async_trait]
impl Refresh for TradingDesk {
    async fn refresh(&self) -> bool {
        self.load_data().await.is_ok()
    }
}

/// Handle to a running refresh loop. The loop waits for a connected
/// session, queries once immediately and then once per period. It ends on
/// [`Poller::stop`], on drop, or when the session disconnects.
pub struct Poller {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn start(
        target: Arc<dyn Refresh>,
        mut session: watch::Receiver<WalletSession>,
        period: Duration,
        metrics: Metrics,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            // Nothing to poll until an account is connected
            while !session.borrow_and_update().connected {
                tokio::select! {
                    _ = &mut stop_rx => return,
                    changed = session.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }

            info!("Starting refresh every {:?}", period);
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => {
                        debug!("Refresh stopped");
                        break;
                    }
                    changed = session.changed() => {
                        if changed.is_err() || !session.borrow_and_update().connected {
                            info!("Wallet disconnected, stopping refresh");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        metrics.polls.inc();
                        if !target.refresh().await {
                            metrics.poll_failures.inc();
                            warn!("Refresh failed, keeping previous data");
                        }
                    }
                }
            }
        });

        Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the loop and waits for an in-flight refresh to finish.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Refresh task ended abnormally: {}", e);
                }
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[derive(Default)]
    struct Counter {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Refresh for Counter {
        async fn refresh(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            !self.fail
        }
    }

    impl Counter {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn connected() -> WalletSession {
        WalletSession {
            connected: true,
            address: Some("0xa11ce".to_string()),
            ..WalletSession::default()
        }
    }

    const PERIOD: Duration = Duration::from_secs(10);

    #[tokio::test(start_paused = true)]
    async fn queries_immediately_then_once_per_period() {
        let counter = Arc::new(Counter::default());
        let (_tx, rx) = watch::channel(connected());
        let poller = Poller::start(counter.clone(), rx, PERIOD, Metrics::new().unwrap());

        sleep(Duration::from_millis(1)).await;
        assert_eq!(counter.calls(), 1);

        sleep(Duration::from_millis(9_900)).await;
        assert_eq!(counter.calls(), 1);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.calls(), 2);

        sleep(PERIOD * 3).await;
        assert_eq!(counter.calls(), 5);

        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_queries() {
        let counter = Arc::new(Counter::default());
        let (_tx, rx) = watch::channel(connected());
        let poller = Poller::start(counter.clone(), rx, PERIOD, Metrics::new().unwrap());

        sleep(Duration::from_millis(1)).await;
        poller.stop().await;

        sleep(PERIOD * 5).await;
        assert_eq!(counter.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_halts_queries() {
        let counter = Arc::new(Counter::default());
        let (tx, rx) = watch::channel(connected());
        let poller = Poller::start(counter.clone(), rx, PERIOD, Metrics::new().unwrap());

        sleep(Duration::from_millis(1)).await;
        tx.send_replace(WalletSession::default());

        sleep(PERIOD * 5).await;
        assert_eq!(counter.calls(), 1);
        assert!(poller.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_connection() {
        let counter = Arc::new(Counter::default());
        let (tx, rx) = watch::channel(WalletSession::default());
        let _poller = Poller::start(counter.clone(), rx, PERIOD, Metrics::new().unwrap());

        sleep(PERIOD * 2).await;
        assert_eq!(counter.calls(), 0);

        tx.send_replace(connected());
        sleep(Duration::from_millis(1)).await;
        assert_eq!(counter.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_counted() {
        let counter = Arc::new(Counter {
            fail: true,
            ..Counter::default()
        });
        let metrics = Metrics::new().unwrap();
        let (_tx, rx) = watch::channel(connected());
        let poller = Poller::start(counter.clone(), rx, PERIOD, metrics.clone());

        sleep(PERIOD + Duration::from_millis(1)).await;
        poller.stop().await;

        assert_eq!(metrics.polls.get(), 2);
        assert_eq!(metrics.poll_failures.get(), 2);
    }
}
