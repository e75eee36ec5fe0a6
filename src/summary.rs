// Household summary
// Condenses the overview and weight responses into per-cat and per-machine records

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const POUNDS_PER_GRAM: f64 = 0.00220462;

/// Elimination types always present in `event_counts`
const ELIMINATION_TYPES: &[&str] = &["urination", "defecation", "combo", "unknown"];

/// Treat an explicit `null` like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Entries stay raw so one malformed cat or machine does not drop the rest
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Household {
    #[serde(default, deserialize_with = "null_as_default")]
    cats: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    machines: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Cat {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    activity_state: Option<ActivityState>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityState {
    #[serde(default)]
    most_recent_event: Option<Value>,
    #[serde(default)]
    last_activated: Option<String>,
    #[serde(default)]
    cat_not_seen_warning: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Machine {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    battery_percentage: Option<f64>,
    #[serde(default)]
    show_battery_warning: Option<bool>,
    #[serde(default)]
    wifi_rssi: Option<f64>,
    #[serde(default)]
    power_mode: Option<String>,
    #[serde(default)]
    is_frozen: Option<bool>,
    #[serde(default)]
    most_recent_upload_at: Option<String>,
    #[serde(default)]
    most_recent_upload_warning: Option<bool>,
    #[serde(default)]
    is_dirty: Option<bool>,
    #[serde(default)]
    balanced_status: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    elimination_events: Vec<EliminationEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EliminationEvent {
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    normalised_classification: Option<Classification>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Classification {
    #[serde(default, deserialize_with = "null_as_default")]
    is_cat: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    is_elimination: bool,
    #[serde(default)]
    elim_type: Option<String>,
    #[serde(default)]
    cat: Option<CatRef>,
}

#[derive(Debug, Deserialize)]
struct CatRef {
    id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatSummary {
    pub id: Option<String>,
    pub name: Option<String>,
    pub most_recent_event: Option<Value>,
    pub last_activated: Option<String>,
    pub cat_not_seen_warning: bool,
    /// Latest mean weight over the weight window
    pub weight_lbs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EliminationSummary {
    pub start_time: Option<String>,
    pub elimination_type: String,
    pub cat_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineSummary {
    pub name: Option<String>,
    pub battery_percentage: Option<f64>,
    pub show_battery_warning: bool,
    pub wifi_rssi: Option<f64>,
    pub power_mode: Option<String>,
    pub is_frozen: bool,
    pub most_recent_upload: Option<String>,
    pub upload_warning: bool,
    pub is_dirty: bool,
    pub balanced_status: Option<Value>,
    pub recent_events: Vec<EliminationSummary>,
    pub event_counts: BTreeMap<String, u32>,
    /// Newest event first, as delivered by the API
    pub most_recent_event: Option<EliminationSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HouseholdSummary {
    pub cats: Vec<CatSummary>,
    pub machines: Vec<MachineSummary>,
}

/// Summarize an overview (`GetStatus`) response
///
/// A response without a household yields an empty summary.
pub fn household(response: &Value) -> HouseholdSummary {
    let Some(raw) = response.pointer("/data/authenticate/myHousehold") else {
        tracing::debug!("No household in status response");
        return HouseholdSummary::default();
    };

    let household: Household = match serde_json::from_value(raw.clone()) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!("Failed to parse household data: {}", e);
            return HouseholdSummary::default();
        }
    };

    HouseholdSummary {
        cats: parse_entries::<Cat>("cat", household.cats)
            .map(summarize_cat)
            .collect(),
        machines: parse_entries::<Machine>("machine", household.machines)
            .map(summarize_machine)
            .collect(),
    }
}

fn parse_entries<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    entries: Vec<Value>,
) -> impl Iterator<Item = T> {
    entries
        .into_iter()
        .filter_map(move |entry| match serde_json::from_value(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Skipping unreadable {} entry: {}", kind, e);
                None
            }
        })
}

fn summarize_cat(cat: Cat) -> CatSummary {
    let state = cat.activity_state.unwrap_or_default();
    CatSummary {
        id: cat.id,
        name: cat.name,
        most_recent_event: state.most_recent_event,
        last_activated: state.last_activated,
        cat_not_seen_warning: state.cat_not_seen_warning.unwrap_or(false),
        weight_lbs: None,
    }
}

fn summarize_machine(machine: Machine) -> MachineSummary {
    let mut event_counts: BTreeMap<String, u32> = ELIMINATION_TYPES
        .iter()
        .map(|t| (t.to_string(), 0))
        .collect();

    let recent_events: Vec<EliminationSummary> = machine
        .elimination_events
        .into_iter()
        .filter_map(|event| {
            let class = event.normalised_classification?;
            if !(class.is_cat && class.is_elimination) {
                return None;
            }
            Some(EliminationSummary {
                start_time: event.start_time,
                elimination_type: class.elim_type.unwrap_or_else(|| "unknown".to_string()),
                cat_id: class.cat.and_then(|c| c.id),
            })
        })
        .collect();

    for event in &recent_events {
        *event_counts
            .entry(event.elimination_type.clone())
            .or_insert(0) += 1;
    }

    MachineSummary {
        name: machine.name,
        battery_percentage: machine.battery_percentage,
        show_battery_warning: machine.show_battery_warning.unwrap_or(false),
        wifi_rssi: machine.wifi_rssi,
        power_mode: machine.power_mode,
        is_frozen: machine.is_frozen.unwrap_or(false),
        most_recent_upload: machine.most_recent_upload_at,
        upload_warning: machine.most_recent_upload_warning.unwrap_or(false),
        is_dirty: machine.is_dirty.unwrap_or(false),
        balanced_status: machine.balanced_status,
        most_recent_event: recent_events.first().cloned(),
        recent_events,
        event_counts,
    }
}

/// Latest mean weight in a `GetCatWeight` response, converted from grams to pounds
pub fn latest_weight_lbs(response: &Value) -> Option<f64> {
    let grams = response
        .pointer("/data/authenticate/node/aggregatedEvents/weight")?
        .as_array()?
        .last()?
        .get("mean")?
        .as_f64()?;

    Some(grams_to_pounds(grams))
}

fn grams_to_pounds(grams: f64) -> f64 {
    (grams * POUNDS_PER_GRAM * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status_response() -> Value {
        json!({
            "data": { "authenticate": { "myHousehold": {
                "cats": [
                    {
                        "id": "cat-1",
                        "name": "Miso",
                        "activityState": {
                            "mostRecentEvent": "2025-03-08T07:12:00Z",
                            "lastActivated": "2025-03-08T07:12:00Z",
                            "catNotSeenWarning": false
                        }
                    },
                    { "id": "cat-2", "name": "Tofu", "activityState": null }
                ],
                "machines": [{
                    "name": "Upstairs",
                    "batteryPercentage": 87,
                    "showBatteryWarning": false,
                    "wifiRssi": -61,
                    "powerMode": "BATTERY",
                    "isFrozen": false,
                    "mostRecentUploadAt": "2025-03-08T07:15:00Z",
                    "mostRecentUploadWarning": false,
                    "isDirty": true,
                    "balancedStatus": "BALANCED",
                    "eliminationEvents": [
                        { "startTime": "2025-03-08T07:12:00Z", "normalisedClassification": {
                            "isCat": true, "isElimination": true, "elimType": "urination", "cat": { "id": "cat-1" } } },
                        { "startTime": "2025-03-08T05:00:00Z", "normalisedClassification": {
                            "isCat": true, "isElimination": false, "elimType": null, "cat": null } },
                        { "startTime": "2025-03-07T22:40:00Z", "normalisedClassification": {
                            "isCat": true, "isElimination": true, "elimType": "defecation", "cat": { "id": "cat-2" } } },
                        { "startTime": "2025-03-07T20:00:00Z", "normalisedClassification": {
                            "isCat": true, "isElimination": true, "elimType": "urination", "cat": { "id": "cat-2" } } }
                    ]
                }]
            } } }
        })
    }

    #[test]
    fn test_cats_are_extracted() {
        let summary = household(&status_response());

        assert_eq!(summary.cats.len(), 2);
        assert_eq!(summary.cats[0].id.as_deref(), Some("cat-1"));
        assert_eq!(summary.cats[0].name.as_deref(), Some("Miso"));
        assert_eq!(
            summary.cats[0].last_activated.as_deref(),
            Some("2025-03-08T07:12:00Z")
        );
        assert!(!summary.cats[1].cat_not_seen_warning);
        assert!(summary.cats[1].last_activated.is_none());
    }

    #[test]
    fn test_machine_event_counts() {
        let summary = household(&status_response());
        let machine = &summary.machines[0];

        assert_eq!(machine.recent_events.len(), 3);
        assert_eq!(machine.event_counts["urination"], 2);
        assert_eq!(machine.event_counts["defecation"], 1);
        assert_eq!(machine.event_counts["combo"], 0);
        assert_eq!(machine.event_counts["unknown"], 0);
        assert_eq!(
            machine.most_recent_event.as_ref().unwrap().cat_id.as_deref(),
            Some("cat-1")
        );
        assert_eq!(machine.battery_percentage, Some(87.0));
        assert!(machine.is_dirty);
    }

    #[test]
    fn test_null_fields_keep_the_rest_of_the_household() {
        let response = json!({
            "data": { "authenticate": { "myHousehold": {
                "cats": [
                    { "id": "cat-1", "name": null, "activityState": { "catNotSeenWarning": null } },
                    { "id": null, "name": "Stray" },
                    "not a cat"
                ],
                "machines": [
                    {
                        "name": "Upstairs",
                        "isDirty": null,
                        "eliminationEvents": [
                            { "startTime": "2025-03-08T07:12:00Z", "normalisedClassification": {
                                "isCat": null, "isElimination": true, "elimType": "urination" } },
                            { "startTime": "2025-03-08T06:00:00Z", "normalisedClassification": {
                                "isCat": true, "isElimination": true, "elimType": null, "cat": null } }
                        ]
                    },
                    { "name": "Downstairs", "eliminationEvents": null }
                ]
            } } }
        });

        let summary = household(&response);

        assert_eq!(summary.cats.len(), 2);
        assert_eq!(summary.cats[0].id.as_deref(), Some("cat-1"));
        assert!(!summary.cats[0].cat_not_seen_warning);
        assert!(summary.cats[1].id.is_none());

        assert_eq!(summary.machines.len(), 2);
        assert_eq!(summary.machines[0].recent_events.len(), 1);
        assert_eq!(summary.machines[0].event_counts["unknown"], 1);
        assert_eq!(summary.machines[0].event_counts["urination"], 0);
        assert!(summary.machines[1].recent_events.is_empty());
        assert_eq!(summary.machines[1].name.as_deref(), Some("Downstairs"));
    }

    #[test]
    fn test_null_lists_are_empty() {
        let response = json!({
            "data": { "authenticate": { "myHousehold": { "cats": null, "machines": null } } }
        });
        assert_eq!(household(&response), HouseholdSummary::default());
    }

    #[test]
    fn test_missing_household_is_empty() {
        assert_eq!(
            household(&json!({ "data": null, "errors": [] })),
            HouseholdSummary::default()
        );
        assert_eq!(
            household(&json!({ "data": { "authenticate": { "myHousehold": "oops" } } })),
            HouseholdSummary::default()
        );
    }

    #[test]
    fn test_latest_weight_in_pounds() {
        let response = json!({
            "data": { "authenticate": { "node": { "aggregatedEvents": { "weight": [
                { "start": "2025-03-01", "mean": 4400.0 },
                { "start": "2025-03-02", "mean": 4536.0 }
            ] } } } }
        });

        assert_eq!(latest_weight_lbs(&response), Some(10.0));
    }

    #[test]
    fn test_latest_weight_absent() {
        let empty = json!({
            "data": { "authenticate": { "node": { "aggregatedEvents": { "weight": [] } } } }
        });
        assert_eq!(latest_weight_lbs(&empty), None);

        let null_mean = json!({
            "data": { "authenticate": { "node": { "aggregatedEvents": { "weight": [{ "mean": null }] } } } }
        });
        assert_eq!(latest_weight_lbs(&null_mean), None);
    }
}
