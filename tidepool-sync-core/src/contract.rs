//! # contract: interfaces to the two remote services
//!
//! The sync pipelines never talk HTTP themselves. They read from a
//! [`TidepoolSource`] and write to a [`NightscoutTarget`]; concrete clients
//! implement these traits (see [`crate::tidepool_client`] and the CLI crate's
//! Nightscout client), tests implement them with `mockall`.
//!
//! ## Errors
//! - Every method returns a boxed [`ClientError`]. The pipelines do not inspect
//!   it; they wrap it with the failing step and hand it to the caller.
//!
//! ## Mocking & Testing
//! - Both traits are annotated with `automock`, exported under the default
//!   `test-export-mocks` feature so integration tests in other crates can use
//!   `MockTidepoolSource` and `MockNightscoutTarget`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::nightscout::{Profile, StoredProfile, Treatment};
use crate::tidepool::{Bolus, Food, PhysicalActivity, PumpSettings};

/// Error returned by a remote service client.
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// Time range for fetching Tidepool records: inclusive start, optional
/// exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub since: DateTime<Utc>,
    pub till: Option<DateTime<Utc>>,
}

/// Read access to Tidepool device data. Any collection may be empty.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TidepoolSource: Send + Sync {
    /// Pump-settings snapshots recorded in the window.
    async fn pump_settings(&self, window: SyncWindow) -> Result<Vec<PumpSettings>, ClientError>;

    async fn boluses(&self, window: SyncWindow) -> Result<Vec<Bolus>, ClientError>;

    async fn food(&self, window: SyncWindow) -> Result<Vec<Food>, ClientError>;

    async fn physical_activity(
        &self,
        window: SyncWindow,
    ) -> Result<Vec<PhysicalActivity>, ClientError>;
}

/// Read/write access to a Nightscout site.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait NightscoutTarget: Send + Sync {
    /// Identity (fingerprint and storage id) of every stored profile.
    async fn profiles(&self) -> Result<Vec<StoredProfile>, ClientError>;

    /// Creates the profile when `id` is unset, replaces the stored one otherwise.
    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile, ClientError>;

    /// Submits treatments, returning what Nightscout stored.
    async fn add_treatments(&self, treatments: &[Treatment])
        -> Result<Vec<Treatment>, ClientError>;
}
