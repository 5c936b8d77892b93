//! Nightscout documents written by the sync pipelines.
//!
//! Field names follow the Nightscout v1 REST API (`/api/v1/profile`,
//! `/api/v1/treatments`).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identity of a profile: the epoch-millisecond rendering of the snapshot's
/// device time. Compared by content, never by storage id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProfileFingerprint(String);

impl ProfileFingerprint {
    pub fn from_millis(millis: i64) -> Self {
        ProfileFingerprint(millis.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProfileFingerprint {
    // Other uploaders store `mills` as a JSON number.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => ProfileFingerprint(s),
            Raw::Int(n) => ProfileFingerprint::from_millis(n),
            Raw::Float(f) => ProfileFingerprint::from_millis(f as i64),
        })
    }
}

/// A Nightscout profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Storage id; set only when the profile already exists in Nightscout.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
    pub mills: ProfileFingerprint,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub store: BTreeMap<String, ProfileInfo>,
}

impl Profile {
    /// Returns the named schedule, creating an empty one on first reference.
    pub fn schedule_mut(&mut self, name: &str) -> &mut ProfileInfo {
        self.store
            .entry(name.to_owned())
            .or_insert_with(ProfileInfo::default)
    }
}

/// One named schedule inside a profile's `store`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    #[serde(default)]
    pub basal: Vec<ScheduleEntry>,
    #[serde(default)]
    pub target_low: Vec<ScheduleEntry>,
    #[serde(default)]
    pub target_high: Vec<ScheduleEntry>,
    #[serde(default)]
    pub carbratio: Vec<ScheduleEntry>,
    #[serde(default)]
    pub sens: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Clock time, `HH:MM`.
    pub time: String,
    pub time_as_seconds: String,
    pub value: String,
}

/// Identity projection of a profile already stored in Nightscout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredProfile {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub mills: Option<ProfileFingerprint>,
}

/// A Nightscout treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(
        rename = "eventType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub event_type: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "enteredBy")]
    pub entered_by: String,
}
