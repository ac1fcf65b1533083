//! Wall-clock scheduling of scans.

use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use tracing::{error, info};

use super::{scan_once, ScanKind};
use crate::api::WeiboClient;
use crate::config::Config;
use crate::db::Database;

/// Run a manual-window scan now, then a scheduled-window scan at every
/// configured time of day, forever.
pub async fn run_loop(config: Config, db: Database, client: WeiboClient) {
    run_logged(&config, &db, &client, ScanKind::Manual).await;

    loop {
        let now = Local::now().naive_local();
        let Some(next) = next_run_after(now, &config.schedule_times) else {
            error!("No schedule times configured, stopping scheduler");
            return;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(next_run = %next, wait_secs = wait.as_secs(), "Waiting for next scheduled scan");

        tokio::time::sleep(wait).await;
        run_logged(&config, &db, &client, ScanKind::Scheduled).await;
    }
}

async fn run_logged(config: &Config, db: &Database, client: &WeiboClient, kind: ScanKind) {
    if let Err(e) = scan_once(config, db, client, kind).await {
        error!(?kind, "Scan failed: {e:#}");
    }
}

/// The first configured time strictly after `now`, today or tomorrow.
#[must_use]
pub fn next_run_after(now: NaiveDateTime, times: &[NaiveTime]) -> Option<NaiveDateTime> {
    let today = now.date();
    let later_today = times
        .iter()
        .map(|t| today.and_time(*t))
        .filter(|candidate| *candidate > now)
        .min();

    later_today.or_else(|| {
        let tomorrow = today + TimeDelta::days(1);
        times.iter().min().map(|t| tomorrow.and_time(*t))
    })
}
