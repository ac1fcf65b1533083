mod refresh;
mod scanner;
pub mod schedule;

pub use refresh::{refresh_all, RefreshReport};
pub use scanner::{
    classify_entry, cutoff_for, EntryVerdict, ScanKind, ScanOptions, ScanReport, Scanner,
    StopReason,
};
pub use schedule::run_loop;

use anyhow::Result;
use chrono::Local;

use crate::api::WeiboClient;
use crate::config::Config;
use crate::db::Database;

/// Run one scan of the configured account against the live API, with the
/// current local time as reference.
///
/// # Errors
///
/// Returns an error if the scan cannot start.
pub async fn scan_once(
    config: &Config,
    db: &Database,
    client: &WeiboClient,
    kind: ScanKind,
) -> Result<ScanReport> {
    let options = ScanOptions::from_config(config, kind);
    Scanner::new(client, db, options)
        .run(Local::now().fixed_offset())
        .await
}
