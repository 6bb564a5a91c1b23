use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::filter::Filter;
use super::types::{FilterOp, FilterValue, FilterWhereInfo};

/// Evaluates a `Filter` against JSON records held in process memory.
///
/// Follows SQL semantics where they matter: a NULL column never satisfies a
/// comparison, only `IS NULL`.
pub struct FilterMatch;

impl FilterMatch {
    pub fn matches(filter: &Filter, record: &Value) -> bool {
        if !filter.options().include_deleted && !field(record, "deleted_at").is_null() {
            return false;
        }
        filter.conditions().iter().all(|condition| Self::matches_condition(condition, record))
    }

    fn matches_condition(condition: &FilterWhereInfo, record: &Value) -> bool {
        let value = field(record, &condition.column);
        match condition.operator {
            FilterOp::IsNull => value.is_null(),
            FilterOp::NotNull => !value.is_null(),
            FilterOp::In => condition.data.iter().any(|v| compare_value(value, v) == Some(Ordering::Equal)),
            op => {
                let expected = condition.data.first().unwrap_or(&FilterValue::Null);
                if expected == &FilterValue::Null {
                    return match op {
                        FilterOp::Eq => value.is_null(),
                        FilterOp::Neq => !value.is_null(),
                        _ => false,
                    };
                }
                match compare_value(value, expected) {
                    Some(ordering) => match op {
                        FilterOp::Eq => ordering == Ordering::Equal,
                        FilterOp::Neq => ordering != Ordering::Equal,
                        FilterOp::Gt => ordering == Ordering::Greater,
                        FilterOp::Gte => ordering != Ordering::Less,
                        FilterOp::Lt => ordering == Ordering::Less,
                        FilterOp::Lte => ordering != Ordering::Greater,
                        _ => false,
                    },
                    None => false,
                }
            }
        }
    }
}

fn field<'a>(record: &'a Value, column: &str) -> &'a Value {
    record.get(column).unwrap_or(&Value::Null)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_time(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Compare a stored JSON value with a filter value, `None` when incomparable or NULL
pub fn compare_value(stored: &Value, expected: &FilterValue) -> Option<Ordering> {
    if stored.is_null() {
        return None;
    }
    match expected {
        FilterValue::Null => None,
        FilterValue::Bool(b) => stored.as_bool().map(|s| s.cmp(b)),
        FilterValue::Int(i) => as_number(stored).and_then(|s| s.partial_cmp(&(*i as f64))),
        FilterValue::Float(f) => as_number(stored).and_then(|s| s.partial_cmp(f)),
        FilterValue::Text(t) => stored.as_str().map(|s| s.cmp(t.as_str())),
        FilterValue::Uuid(u) => stored
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(|s| s.cmp(u)),
        FilterValue::Time(t) => as_time(stored).map(|s| s.cmp(t)),
    }
}

/// Total order over stored JSON values used for in-memory `ORDER BY`; NULLs sort last
pub fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    if let (Some(x), Some(y)) = (as_time(a), as_time(b)) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
