use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::notification::service::NotificationService;

/// Background refresh of the notification list.
///
/// Fetches once on start, then on every tick and whenever the service asks for
/// a refresh. A single task does all fetching, so at most one request is in
/// flight. Dropping the poller aborts it.
pub struct NotificationPoller {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl NotificationPoller {
    pub fn spawn(service: Arc<NotificationService>, period: Duration) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(service, period, shutdown_rx));

        info!("Notification poller started, every {:?}", period);
        Self {
            shutdown,
            task: Some(task),
        }
    }

    /// Stop polling. A fetch still in flight is dropped and never applied.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Notification poller ended abnormally: {}", e);
            }
        }
        info!("Notification poller stopped");
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    service: Arc<NotificationService>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = interval.tick() => {}
            _ = service.refresh_requested() => {
                debug!("Refresh requested ahead of schedule");
                interval.reset();
            }
        }

        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                debug!("Poller stopped during fetch, discarding result");
                break;
            }
            result = service.poll_once() => {
                if let Err(e) = result {
                    warn!("Notification poll failed, keeping last snapshot: {}", e);
                }
            }
        }
    }
}
