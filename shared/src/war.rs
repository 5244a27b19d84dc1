use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Statistic keys surfaced to the dashboard; everything else in the payload is ignored.
pub const ALLOWED_STATISTICS: [&str; 8] = [
    "playerCount",
    "bulletsFired",
    "terminidKills",
    "automatonKills",
    "missionSuccessRate",
    "illuminateKills",
    "bulletsHit",
    "deaths",
];

/// One rendered statistic row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatItem {
    pub key: String,
    pub label: String,
    pub value: Value,
}

pub fn is_allowed_statistic(key: &str) -> bool {
    ALLOWED_STATISTICS.contains(&key)
}

/// Pick the allowlisted entries out of `payload.statistics`, preserving payload order.
///
/// A payload without a `statistics` object yields an empty list.
pub fn filter_statistics(payload: &Value) -> Vec<StatItem> {
    let Some(statistics) = payload.get("statistics").and_then(Value::as_object) else {
        return Vec::new();
    };

    statistics
        .iter()
        .filter(|(key, _)| is_allowed_statistic(key))
        .map(|(key, value)| StatItem {
            key: key.clone(),
            label: format_key_name(key),
            value: value.clone(),
        })
        .collect()
}

/// `playerCount` -> `Player Count`.
pub fn format_key_name(key: &str) -> String {
    let mut label = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            label.push(' ');
            label.push(ch);
        } else if i == 0 {
            label.extend(ch.to_uppercase());
        } else {
            label.push(ch);
        }
    }
    label
}
