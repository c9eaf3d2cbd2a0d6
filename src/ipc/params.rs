use crate::calendar;
use crate::ipc::reply::HandlerErr;
use crate::model::RecordId;
use chrono::NaiveDate;
use serde_json::{json, Value};

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_required_id(params: &Value, key: &str) -> Result<RecordId, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

/// A required calendar day: `YYYY-MM-DD`, or an RFC3339 timestamp whose
/// time-of-day is dropped.
pub fn get_required_day(params: &Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let raw = get_required_str(params, key)?;
    calendar::parse_day(&raw).ok_or_else(|| {
        HandlerErr::new(
            "bad_params",
            format!("{} must be YYYY-MM-DD or an RFC3339 timestamp", key),
        )
        .with_details(json!({ "value": raw }))
    })
}

pub fn get_opt_trimmed_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
