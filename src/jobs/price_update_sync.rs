//! Periodic price update job.
//!
//! Triggers one orchestrator cycle at each scheduled slot: every 30 minutes
//! during weekday trading hours (09:00-11:30 and 13:00-14:30) plus a single
//! after-close run at 15:30, local time. A slot that fires while the
//! previous cycle is still running is absorbed by the orchestrator's
//! admission gate.

use chrono::{Datelike, Local, NaiveDateTime};

use crate::AppState;
use crate::services::price_updater::run_price_update_cycle;

/// Weekday trigger slots as (hour, minute), local time.
const SLOTS: [(u32, u32); 11] = [
    (9, 0),
    (9, 30),
    (10, 0),
    (10, 30),
    (11, 0),
    (11, 30),
    (13, 0),
    (13, 30),
    (14, 0),
    (14, 30),
    (15, 30),
];

pub async fn start_price_update_job(state: AppState) {
    tokio::spawn(async move {
        loop {
            let now = Local::now().naive_local();
            let next = next_scheduled(now);
            let wait = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));

            tracing::info!("next price update scheduled for {}", next);
            tokio::time::sleep(wait).await;

            match run_price_update_cycle(
                &state.db,
                &state.market_data,
                &state.auto_close,
                &state.cycle_gate,
            )
            .await
            {
                Ok(report) if report.skipped => {
                    tracing::warn!("scheduled price update skipped, cycle still running")
                }
                Ok(_) => {}
                Err(e) => tracing::error!("scheduled price update failed: {}", e),
            }
        }
    });
}

/// First trigger slot strictly after `now`. Weekends roll forward to Monday
/// morning.
pub fn next_scheduled(now: NaiveDateTime) -> NaiveDateTime {
    let mut day = now.date();
    loop {
        if day.weekday().number_from_monday() <= 5 {
            for (hour, minute) in SLOTS {
                let slot = day.and_hms_opt(hour, minute, 0).unwrap();
                if slot > now {
                    return slot;
                }
            }
        }
        day = day.succ_opt().unwrap();
    }
}
