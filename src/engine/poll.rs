use std::sync::mpsc::Sender;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::types::Report;

use super::backend::fetch_reports_page;
use super::interface::Event;

/// Re-fetches one reports page while any report on it is still being
/// generated.
///
/// At most one polling task runs; it is keyed by `(page, size)` so that a
/// page change restarts it. The task ends on its own once no transient
/// report remains, or when the view's receiver is gone.
pub struct TransientPoller {
    interval: Duration,
    task: Option<((usize, usize), JoinHandle<()>)>,
}

impl TransientPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(100)),
            task: None,
        }
    }

    /// Start, keep, restart or stop polling after a foreground page fetch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn sync(
        &mut self,
        page: usize,
        size: usize,
        reports: &[Report],
        client: &ApiClient,
        notify_tx: &Sender<Event>,
    ) {
        if !reports.iter().any(|r| r.status.is_transient()) {
            self.stop();
            return;
        }
        if let Some((key, handle)) = &self.task
            && *key == (page, size)
            && !handle.is_finished()
        {
            return;
        }
        self.stop();

        tracing::info!(page, size, interval = ?self.interval, "starting report status poller");
        let handle = tokio::spawn(poll_loop(
            client.clone(),
            page,
            size,
            self.interval,
            notify_tx.clone(),
        ));
        self.task = Some(((page, size), handle));
    }

    pub fn stop(&mut self) {
        if let Some(((page, size), handle)) = self.task.take() {
            if !handle.is_finished() {
                tracing::info!(page, size, "stopping report status poller");
            }
            handle.abort();
        }
    }
}

impl Drop for TransientPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    client: ApiClient,
    page: usize,
    size: usize,
    interval: Duration,
    notify_tx: Sender<Event>,
) {
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; the page was just fetched.
    tick.tick().await;

    loop {
        tick.tick().await;
        match fetch_reports_page(&client, page, size, true).await {
            Ok((reports, total_count)) => {
                let transient = reports.iter().filter(|r| r.status.is_transient()).count();
                tracing::debug!(page, size, transient, "poller: page refreshed");
                let sent = notify_tx.send(Event::ReportsPageFetched {
                    page,
                    size,
                    reports,
                    total_count,
                    background: true,
                });
                if sent.is_err() {
                    break;
                }
                if transient == 0 {
                    tracing::info!(page, size, "no reports in progress; poller done");
                    break;
                }
            }
            Err(e) => tracing::warn!(page, size, "poller: fetch failed: {e}"),
        }
    }
}
