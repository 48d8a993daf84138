//! Machine-readable rendering of condition results for plan output.

use serde::{Deserialize, Serialize};

use crate::types::Conditions;

/// One condition result as it appears in JSON plan output.
///
/// `address` is the object that owns the rule, not the rule itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonConditionResult {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition_type: String,
    pub result: bool,
    pub unknown: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
}

/// Convert every stored result, ordered by rule address. Owner and rule
/// kind compare as text; rules of the same kind follow their index, so
/// `preconditions[2]` comes before `preconditions[10]`.
#[must_use]
pub fn marshal_condition_results(conditions: &Conditions) -> Vec<JsonConditionResult> {
    let mut entries: Vec<(&str, JsonConditionResult)> = conditions
        .iter()
        .map(|(rule_addr, r)| {
            let (result, error_message) = if r.unknown {
                (false, String::new())
            } else {
                (r.result, r.error_message.clone())
            };
            let entry = JsonConditionResult {
                address: r.address.to_string(),
                condition_type: r.condition_type.to_string(),
                result,
                unknown: r.unknown,
                error_message,
            };
            (rule_addr, entry)
        })
        .collect();
    entries.sort_by(|a, b| sort_key(a.0).cmp(&sort_key(b.0)));
    entries.into_iter().map(|(_, e)| e).collect()
}

/// Split `{owner}.{kind}[{index}]` into the part before the final index and
/// the index itself.
fn sort_key(rule_addr: &str) -> (&str, Option<u64>, &str) {
    let index = rule_addr
        .strip_suffix(']')
        .and_then(|rest| rest.rsplit_once('['))
        .and_then(|(prefix, digits)| digits.parse().ok().map(|i| (prefix, i)));
    match index {
        Some((prefix, i)) => (prefix, Some(i), rule_addr),
        None => (rule_addr, None, rule_addr),
    }
}

/// Render every stored result as a JSON array.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if rendering fails.
pub fn to_json(conditions: &Conditions) -> Result<String, serde_json::Error> {
    serde_json::to_string(&marshal_condition_results(conditions))
}
