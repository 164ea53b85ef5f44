//! Daily notification scheduling.
//!
//! Each schedule entry becomes one independent tokio task that sleeps
//! until the next local HH:MM occurrence, runs the query flow, and
//! dispatches the result to the binding's identity. Jobs are keyed by
//! binding id: re-scheduling replaces the existing job, and an identity
//! that unbinds and rebinds cannot collide with a stale job. A failure
//! in one job is logged and never affects another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Days, Duration, Local, TimeZone};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, StorageError, ValidationError};
use crate::notify::Messenger;
use crate::query::{query_room, RoomStatus};
use crate::storage::{BindingDb, HistoryDb, RoomKey};
use crate::upstream::CampusApi;

/// Strictly validate a 24-hour `HH:MM` time string.
pub fn parse_hhmm(input: &str) -> Result<(u8, u8), ValidationError> {
    let bad = || ValidationError::BadTimeFormat(input.to_string());
    let (h, m) = input.split_once(':').ok_or_else(bad)?;
    if h.is_empty()
        || m.is_empty()
        || !h.chars().all(|c| c.is_ascii_digit())
        || !m.chars().all(|c| c.is_ascii_digit())
    {
        return Err(bad());
    }
    let hour: u8 = h.parse().map_err(|_| bad())?;
    let minute: u8 = m.parse().map_err(|_| bad())?;
    if hour > 23 || minute > 59 {
        return Err(bad());
    }
    Ok((hour, minute))
}

/// The next local instant with the given wall-clock time, strictly after
/// `now`. Skips forward past days where that wall-clock time does not
/// exist (DST gap).
fn next_occurrence(now: DateTime<Local>, hour: u8, minute: u8) -> DateTime<Local> {
    for days_ahead in 0..4 {
        let Some(date) = now.date_naive().checked_add_days(Days::new(days_ahead)) else {
            continue;
        };
        let Some(naive) = date.and_hms_opt(u32::from(hour), u32::from(minute), 0) else {
            continue;
        };
        if let Some(candidate) = Local.from_local_datetime(&naive).earliest() {
            if candidate > now {
                return candidate;
            }
        }
    }
    now + Duration::days(1)
}

/// Render the notification text for a completed scheduled query.
pub fn format_notification(room: &RoomKey, status: &RoomStatus) -> String {
    let mut text = format!(
        "Scheduled balance report\n\
         Campus: {}\n\
         Building: {}\n\
         Room: {}\n\
         Remaining balance: {:.2} kWh",
        room.campus, room.building, room.room, status.reading.value,
    );
    if let Some(exhaustion) = status
        .prediction
        .as_ref()
        .and_then(|p| p.exhaustion_time)
    {
        let local = exhaustion.with_timezone(&Local);
        text.push_str(&format!(
            "\nEstimated depletion: {}",
            local.format("%Y-%m-%d %H:%M")
        ));
    }
    text
}

/// Execute one scheduled query for a binding: fetch, record, predict,
/// dispatch. Dispatch failures are logged, not propagated; a job whose
/// binding has disappeared is a no-op.
pub async fn run_scheduled_query<M: Messenger>(
    api: &CampusApi,
    history: &HistoryDb,
    bindings: &BindingDb,
    messenger: &M,
    binding_id: &str,
) -> Result<(), CoreError> {
    let Some(binding) = bindings.binding_by_id(binding_id)? else {
        warn!(binding_id, "scheduled job references a missing binding");
        return Ok(());
    };

    let status = query_room(api, history, &binding.room).await?;
    let text = format_notification(&binding.room, &status);

    if let Err(e) = messenger.dispatch(&binding.identity, &text).await {
        warn!(identity = %binding.identity, error = %e, "notification dispatch failed");
    } else {
        info!(identity = %binding.identity, room = %binding.room, "scheduled report sent");
    }
    Ok(())
}

/// Registry of running daily jobs, one per binding.
pub struct NotificationScheduler<M: Messenger> {
    api: Arc<CampusApi>,
    history: Arc<HistoryDb>,
    bindings: Arc<BindingDb>,
    messenger: Arc<M>,
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl<M: Messenger> NotificationScheduler<M> {
    pub fn new(
        api: Arc<CampusApi>,
        history: Arc<HistoryDb>,
        bindings: Arc<BindingDb>,
        messenger: Arc<M>,
    ) -> Self {
        Self {
            api,
            history,
            bindings,
            messenger,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Register jobs for every persisted schedule entry. Returns the
    /// number of jobs started.
    pub fn load_jobs(&self) -> Result<usize, StorageError> {
        let entries = self.bindings.all_schedules()?;
        let count = entries.len();
        for entry in entries {
            self.schedule_daily(&entry.binding_id, entry.hour, entry.minute);
        }
        info!(count, "scheduled jobs loaded");
        Ok(count)
    }

    /// Start (or replace) the daily job for a binding.
    pub fn schedule_daily(&self, binding_id: &str, hour: u8, minute: u8) {
        let api = Arc::clone(&self.api);
        let history = Arc::clone(&self.history);
        let bindings = Arc::clone(&self.bindings);
        let messenger = Arc::clone(&self.messenger);
        let id = binding_id.to_string();

        let handle = tokio::spawn(async move {
            loop {
                let now = Local::now();
                let next = next_occurrence(now, hour, minute);
                let wait = (next - now).to_std().unwrap_or(std::time::Duration::ZERO);
                debug!(binding_id = %id, next = %next, "job sleeping until next firing");
                tokio::time::sleep(wait).await;

                if let Err(e) =
                    run_scheduled_query(&api, &history, &bindings, messenger.as_ref(), &id).await
                {
                    error!(binding_id = %id, error = %e, "scheduled query failed");
                }
            }
        });

        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = jobs.insert(binding_id.to_string(), handle) {
            old.abort();
        }
        info!(binding_id, hour, minute, "daily job scheduled");
    }

    /// Stop the job for a binding. Returns whether one was running.
    pub fn cancel(&self, binding_id: &str) -> bool {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        match jobs.remove(binding_id) {
            Some(handle) => {
                handle.abort();
                info!(binding_id, "daily job cancelled");
                true
            }
            None => false,
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<M: Messenger> Drop for NotificationScheduler<M> {
    fn drop(&mut self) {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        for handle in jobs.values() {
            handle.abort();
        }
    }
}
