//! Tidepool data models, as returned by the `/data/{userid}` endpoint.
//!
//! Only the fields the sync pipelines read are modelled; everything else in a
//! Tidepool record is ignored on deserialization.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record types requested through the `type` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    PumpSettings,
    Bolus,
    Food,
    PhysicalActivity,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::PumpSettings => "pumpSettings",
            DataType::Bolus => "bolus",
            DataType::Food => "food",
            DataType::PhysicalActivity => "physicalActivity",
        }
    }
}

/// Named schedules keyed by schedule name, ordered for deterministic output.
pub type Schedules<T> = BTreeMap<String, Vec<T>>;

/// One pump-settings snapshot, valid as of `device_time`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpSettings {
    #[serde(default)]
    pub active_schedule: Option<String>,
    #[serde(default)]
    pub automated_delivery: bool,
    /// Local device clock, no timezone attached.
    #[serde(default)]
    pub device_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub basal_schedules: Schedules<BasalSchedule>,
    #[serde(default)]
    pub bg_targets: Schedules<BgTarget>,
    #[serde(default)]
    pub carb_ratios: Schedules<CarbRatio>,
    #[serde(default)]
    pub insulin_sensitivities: Schedules<InsulinSensitivity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Units {
    #[serde(default)]
    pub carb: Option<String>,
    #[serde(default)]
    pub bg: Option<String>,
}

/// Schedule entries carry `start`, an offset in milliseconds from midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasalSchedule {
    pub start: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BgTarget {
    pub start: u64,
    /// Absent on pumps that report only `low`/`high`; read as zero then.
    #[serde(default)]
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbRatio {
    pub start: u64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsulinSensitivity {
    pub start: u64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bolus {
    pub time: DateTime<Utc>,
    /// Delivered amount of a normal bolus, in units of insulin.
    #[serde(default)]
    pub normal: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub nutrition: Option<Nutrition>,
}

impl Food {
    /// Net carbohydrates, if the record carries any.
    pub fn net_carbs(&self) -> Option<f64> {
        self.nutrition
            .as_ref()
            .and_then(|n| n.carbohydrate.as_ref())
            .and_then(|c| c.net)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub carbohydrate: Option<Carbohydrate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Carbohydrate {
    #[serde(default)]
    pub net: Option<f64>,
    #[serde(default)]
    pub units: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalActivity {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duration {
    pub value: f64,
    #[serde(default)]
    pub units: Option<String>,
}

impl Duration {
    /// Duration in seconds. Tidepool reports seconds unless `units` says otherwise.
    pub fn as_seconds(&self) -> f64 {
        match self.units.as_deref() {
            Some("hours") => self.value * 3600.0,
            Some("minutes") => self.value * 60.0,
            _ => self.value,
        }
    }
}
