//! Profile builder: turns the latest Tidepool pump-settings snapshot into a
//! single Nightscout [`Profile`], and matches it against profiles Nightscout
//! already stores so a re-run updates in place.
//!
//! Everything here is pure; fetching and writing live in [`crate::synchronise`].

use chrono::Utc;
use tracing::{debug, warn};

use crate::nightscout::{Profile, ProfileFingerprint, ScheduleEntry, StoredProfile};
use crate::tidepool::PumpSettings;

/// Picks the snapshot with the latest device time. On ties the earliest
/// fetched snapshot wins; snapshots without a device time rank lowest.
pub fn select_latest(settings: &[PumpSettings]) -> Option<&PumpSettings> {
    settings.iter().rev().max_by_key(|s| s.device_time)
}

/// `HH:MM` clock time for a millisecond offset from midnight. Whole seconds
/// first, then hours and minutes; a day component, if any, is dropped.
pub fn format_clock(start_ms: u64) -> String {
    let seconds = start_ms / 1000;
    let hours = (seconds / 3600) % 24;
    let minutes = (seconds / 60) % 60;
    format!("{hours:02}:{minutes:02}")
}

/// The same offset as [`format_clock`], restated in whole seconds.
pub fn format_seconds(start_ms: u64) -> String {
    (start_ms / 1000).to_string()
}

/// Decimal rendering independent of host locale: period separator, no digit
/// grouping, shortest representation that round-trips.
pub fn format_decimal(value: f64) -> String {
    format!("{value}")
}

fn entry(start_ms: u64, value: f64) -> ScheduleEntry {
    ScheduleEntry {
        time: format_clock(start_ms),
        time_as_seconds: format_seconds(start_ms),
        value: format_decimal(value),
    }
}

/// Builds the Nightscout profile for one snapshot.
///
/// Each Tidepool glucose target `d` becomes the interval
/// `[target_low, target_low + d]` at the same offset.
pub fn build_profile(setting: &PumpSettings, target_low: f64) -> Profile {
    let millis = match setting.device_time {
        Some(device_time) => device_time.and_utc().timestamp_millis(),
        None => {
            warn!("Pump settings carry no device time, fingerprinting with current time");
            Utc::now().timestamp_millis()
        }
    };

    let mut profile = Profile {
        id: None,
        default_profile: setting.active_schedule.clone(),
        start_date: setting.device_time,
        mills: ProfileFingerprint::from_millis(millis),
        units: setting.units.bg.clone(),
        store: Default::default(),
    };

    for (name, schedule) in &setting.basal_schedules {
        debug!(schedule = %name, entries = schedule.len(), "Mapping basal schedule");
        profile
            .schedule_mut(name)
            .basal
            .extend(schedule.iter().map(|x| entry(x.start, x.rate)));
    }

    for (name, targets) in &setting.bg_targets {
        debug!(schedule = %name, entries = targets.len(), "Mapping bg targets");
        let info = profile.schedule_mut(name);
        for target in targets {
            info.target_low.push(entry(target.start, target_low));
            info.target_high
                .push(entry(target.start, target_low + target.target));
        }
    }

    for (name, ratios) in &setting.carb_ratios {
        debug!(schedule = %name, entries = ratios.len(), "Mapping carb ratios");
        profile
            .schedule_mut(name)
            .carbratio
            .extend(ratios.iter().map(|x| entry(x.start, x.amount)));
    }

    for (name, sensitivities) in &setting.insulin_sensitivities {
        debug!(schedule = %name, entries = sensitivities.len(), "Mapping insulin sensitivities");
        profile
            .schedule_mut(name)
            .sens
            .extend(sensitivities.iter().map(|x| entry(x.start, x.amount)));
    }

    profile
}

/// Adopts the storage id of the first stored profile with the same
/// fingerprint. Without a match the id is cleared, so the write creates.
pub fn match_existing(profile: &mut Profile, existing: &[StoredProfile]) {
    profile.id = existing
        .iter()
        .find(|stored| stored.mills.as_ref() == Some(&profile.mills))
        .and_then(|stored| stored.id.clone());
    debug!(
        mills = %profile.mills,
        matched = profile.id.is_some(),
        "Matched profile against stored profiles"
    );
}
