//! Periodic cache maintenance
//!
//! 호스트가 소유하는 백그라운드 작업. 주기마다 캐시가 켜져 있으면
//! `ContentGenerator::cleanup()`을 한 번 돌린다. 실패는 로그만 남긴다.

use crate::generator::ContentGenerator;
use fillo_foundation::CleanupReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Hourly
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Handle to a running maintenance loop
pub struct MaintenanceTask {
    handle: JoinHandle<()>,
    last_report: watch::Receiver<Option<CleanupReport>>,
}

impl MaintenanceTask {
    /// Start the loop; the first pass runs one `interval` from now
    pub fn spawn(generator: Arc<ContentGenerator>, interval: Duration) -> Self {
        let (report_tx, last_report) = watch::channel(None);

        let handle = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;

                match generator.cache_enabled().await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!("Cache disabled, skipping maintenance");
                        continue;
                    }
                    Err(e) => {
                        warn!("Maintenance skipped: {}", e);
                        continue;
                    }
                }

                match generator.cleanup().await {
                    Ok(report) => {
                        debug!("Maintenance pass removed {} entries", report.total());
                        let _ = report_tx.send(Some(report));
                    }
                    Err(e) => warn!("Cache cleanup failed: {}", e),
                }
            }
        });

        info!("Cache maintenance every {}s", interval.as_secs());
        Self {
            handle,
            last_report,
        }
    }

    /// Report from the most recent successful pass
    pub fn last_report(&self) -> Option<CleanupReport> {
        *self.last_report.borrow()
    }

    /// Resolves after the next successful pass
    pub async fn next_report(&mut self) -> Option<CleanupReport> {
        self.last_report.changed().await.ok()?;
        *self.last_report.borrow_and_update()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Abort the loop
    pub fn stop(self) {
        self.handle.abort();
        debug!("Cache maintenance stopped");
    }
}
