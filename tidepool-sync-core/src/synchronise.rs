//! High-level pipelines: fetch from Tidepool → build → write to Nightscout.
//!
//! Two independent pipelines share this module:
//!   - [`sync_profiles`]: latest pump settings → one Nightscout profile, matched
//!     against stored profiles by fingerprint so re-runs update in place
//!   - [`sync_treatments`]: boluses, food and activity → merged treatments
//!
//! [`synchronise`] runs both concurrently; they write disjoint Nightscout
//! collections and share no state.
//!
//! # Error Handling
//! A failed fetch or write aborts the pipeline and is returned as a
//! [`SyncError`] wrapping the client error unmodified. There is no retry.
//! Writes happen only after the full result is built in memory.
//!
//! Under [`synchronise`] the first failing pipeline cancels the other, which
//! is dropped at its current await point. A Nightscout write it had in flight
//! may or may not have landed; the next run converges either way.
//!
//! Empty input is not an error: no pump settings means no profile and no
//! write; no events still submits an (empty) treatment batch.

use chrono::Utc;
use thiserror::Error;
use futures::TryFutureExt;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::contract::{ClientError, NightscoutTarget, TidepoolSource};
use crate::nightscout::{Profile, Treatment};
use crate::profile::{build_profile, match_existing, select_latest};
use crate::treatment::build_treatments;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to fetch {resource} from Tidepool: {source}")]
    Source {
        resource: &'static str,
        source: ClientError,
    },
    #[error("failed to {action} on Nightscout: {source}")]
    Target {
        action: &'static str,
        source: ClientError,
    },
}

/// What a full synchronisation wrote.
#[derive(Debug)]
pub struct SynchroniseReport {
    /// Stored profile, or `None` when the window held no pump settings.
    pub profile: Option<Profile>,
    pub treatments: Vec<Treatment>,
}

fn source_error(resource: &'static str) -> impl FnOnce(ClientError) -> SyncError {
    move |source| {
        error!(resource, error = %source, "[SYNC][ERROR] Tidepool fetch failed");
        SyncError::Source { resource, source }
    }
}

fn target_error(action: &'static str) -> impl FnOnce(ClientError) -> SyncError {
    move |source| {
        error!(action, error = %source, "[SYNC][ERROR] Nightscout call failed");
        SyncError::Target { action, source }
    }
}

/// Syncs the latest pump-settings snapshot in the window to a Nightscout
/// profile. Returns the stored profile, or `None` if there was nothing to sync.
pub async fn sync_profiles<S, T>(
    config: &SyncConfig,
    source: &S,
    target: &T,
) -> Result<Option<Profile>, SyncError>
where
    S: TidepoolSource + ?Sized,
    T: NightscoutTarget + ?Sized,
{
    let window = config.window(Utc::now());
    info!(since = %window.since, till = ?window.till, "[SYNC][PROFILE] Fetching pump settings");

    let settings = source
        .pump_settings(window)
        .await
        .map_err(source_error("pump settings"))?;

    let Some(setting) = select_latest(&settings) else {
        info!("[SYNC][PROFILE] No pump settings in window, nothing to sync");
        return Ok(None);
    };
    info!(
        snapshots = settings.len(),
        device_time = ?setting.device_time,
        "[SYNC][PROFILE] Selected latest pump settings"
    );

    let mut profile = build_profile(setting, config.target_low);
    info!(
        mills = %profile.mills,
        schedules = profile.store.len(),
        "[SYNC][PROFILE] Built profile"
    );

    let existing = target
        .profiles()
        .await
        .map_err(target_error("fetch profiles"))?;
    match_existing(&mut profile, &existing);
    match &profile.id {
        Some(id) => info!(id = %id, "[SYNC][PROFILE] Updating existing profile"),
        None => info!("[SYNC][PROFILE] Creating new profile"),
    }

    let stored = target
        .upsert_profile(&profile)
        .await
        .map_err(target_error("store profile"))?;
    info!(id = ?stored.id, "[SYNC][PROFILE] Profile stored");

    Ok(Some(stored))
}

/// Syncs boluses, food and physical activity in the window to Nightscout
/// treatments. Returns what Nightscout stored.
pub async fn sync_treatments<S, T>(
    config: &SyncConfig,
    source: &S,
    target: &T,
) -> Result<Vec<Treatment>, SyncError>
where
    S: TidepoolSource + ?Sized,
    T: NightscoutTarget + ?Sized,
{
    let window = config.window(Utc::now());
    info!(since = %window.since, till = ?window.till, "[SYNC][TREATMENTS] Fetching events");

    let boluses = source
        .boluses(window)
        .await
        .map_err(source_error("boluses"))?;
    let food = source.food(window).await.map_err(source_error("food"))?;
    let activity = source
        .physical_activity(window)
        .await
        .map_err(source_error("physical activity"))?;
    info!(
        boluses = boluses.len(),
        food = food.len(),
        activity = activity.len(),
        "[SYNC][TREATMENTS] Fetched events"
    );

    let treatments = build_treatments(boluses, food, activity);
    info!(count = treatments.len(), "[SYNC][TREATMENTS] Submitting treatments");

    let stored = target
        .add_treatments(&treatments)
        .await
        .map_err(target_error("add treatments"))?;
    info!(count = stored.len(), "[SYNC][TREATMENTS] Treatments stored");

    Ok(stored)
}

/// Runs the profile and treatment pipelines concurrently.
///
/// Fails fast: the first error is returned and the other pipeline is dropped
/// without completing.
pub async fn synchronise<S, T>(
    config: &SyncConfig,
    source: &S,
    target: &T,
) -> Result<SynchroniseReport, SyncError>
where
    S: TidepoolSource + ?Sized,
    T: NightscoutTarget + ?Sized,
{
    info!("[SYNC] Starting full synchronisation");
    let (profile, treatments) = futures::try_join!(
        sync_profiles(config, source, target).inspect_err(|_| {
            warn!("[SYNC] Profile pipeline failed, cancelling treatment pipeline")
        }),
        sync_treatments(config, source, target).inspect_err(|_| {
            warn!("[SYNC] Treatment pipeline failed, cancelling profile pipeline")
        }),
    )?;
    info!(
        profile = profile.is_some(),
        treatments = treatments.len(),
        "[SYNC] Synchronisation complete"
    );
    Ok(SynchroniseReport {
        profile,
        treatments,
    })
}
