//! Treatment builder: merges Tidepool boluses, food and physical activity into
//! Nightscout treatments.
//!
//! Tidepool may return several records for one logical event, all sharing the
//! exact same timestamp. Boluses and food are deduplicated first (first record
//! wins), then a bolus and a food record at the same instant become a single
//! treatment carrying both insulin and carbs.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::nightscout::Treatment;
use crate::tidepool::{Bolus, Food, PhysicalActivity};

/// Attribution written to every treatment.
pub const ENTERED_BY: &str = "Tidepool";

/// Event type tag for treatments built from physical activity.
pub const EXERCISE_EVENT_TYPE: &str = "Exercise";

/// Keeps the first record for each key, preserving input order.
pub fn dedup_first_by<T, K, F>(records: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(key(record)))
        .collect()
}

/// Builds the treatments to submit: bolus-derived first, then food without a
/// matching bolus, then physical activity. Within each group the order of the
/// (deduplicated) source records is kept.
pub fn build_treatments(
    boluses: Vec<Bolus>,
    food: Vec<Food>,
    activity: Vec<PhysicalActivity>,
) -> Vec<Treatment> {
    let fetched_boluses = boluses.len();
    let fetched_food = food.len();

    let boluses = dedup_first_by(boluses, |b| b.time);
    let food = dedup_first_by(food, |f| f.time);
    debug!(
        boluses = boluses.len(),
        duplicate_boluses = fetched_boluses - boluses.len(),
        food = food.len(),
        duplicate_food = fetched_food - food.len(),
        activity = activity.len(),
        "Deduplicated Tidepool records"
    );

    let food_by_time: HashMap<DateTime<Utc>, &Food> = food.iter().map(|f| (f.time, f)).collect();
    let bolus_times: HashSet<DateTime<Utc>> = boluses.iter().map(|b| b.time).collect();

    let with_bolus = boluses.iter().map(|bolus| Treatment {
        carbs: food_by_time.get(&bolus.time).and_then(|f| f.net_carbs()),
        insulin: bolus.normal,
        ..treatment_at(bolus.time)
    });

    let food_only = food
        .iter()
        .filter(|f| !bolus_times.contains(&f.time))
        .map(|f| Treatment {
            carbs: f.net_carbs(),
            ..treatment_at(f.time)
        });

    let exercise = activity.into_iter().map(|a| Treatment {
        notes: a.name,
        duration: a.duration.map(|d| d.as_seconds() / 60.0),
        event_type: Some(EXERCISE_EVENT_TYPE.to_owned()),
        ..treatment_at(a.time)
    });

    with_bolus.chain(food_only).chain(exercise).collect()
}

fn treatment_at(created_at: DateTime<Utc>) -> Treatment {
    Treatment {
        carbs: None,
        insulin: None,
        notes: None,
        duration: None,
        event_type: None,
        created_at,
        entered_by: ENTERED_BY.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_and_order() {
        let records = vec![(3, "a"), (1, "b"), (3, "c"), (2, "d"), (1, "e")];
        let kept = dedup_first_by(records, |r| r.0);
        assert_eq!(kept, vec![(3, "a"), (1, "b"), (2, "d")]);
    }

    #[test]
    fn dedup_of_empty_is_empty() {
        let kept = dedup_first_by(Vec::<(u8, u8)>::new(), |r| r.0);
        assert!(kept.is_empty());
    }
}
