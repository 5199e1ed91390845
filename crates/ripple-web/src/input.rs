#![forbid(unsafe_code)]

//! JSON-encoded host events.
//!
//! Hosts (a JS shell, a replay harness) feed the runner strings; decoding is
//! total and silent — a malformed or unknown event is rejected with `None`,
//! never a panic, so a buggy host cannot take the runner down.
//!
//! Wire form is a tagged object:
//!
//! ```json
//! {"kind":"set_state","key":"count","value":1}
//! {"kind":"dispatch","event_type":"click","payload":{"x":3}}
//! {"kind":"navigate","path":"/settings"}
//! ```

use std::collections::BTreeMap;

use ripple_reactive::Value;

/// One decoded host event.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncodedInput {
    SetState {
        key: String,
        #[serde(default)]
        value: serde_json::Value,
    },
    Dispatch {
        event_type: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    Navigate {
        path: String,
    },
}

/// Decode one host event string. `None` for malformed JSON and for unknown
/// or incomplete event kinds.
#[must_use]
pub fn decode(raw: &str) -> Option<EncodedInput> {
    serde_json::from_str(raw).ok()
}

/// Lower a JSON value into the runtime's closed [`Value`] type.
///
/// Numbers become `f64`; integers beyond `f64` precision lose it, which
/// matches the store's number model.
#[must_use]
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(fields) => Value::Record(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect::<BTreeMap<String, Value>>(),
        ),
    }
}

/// Raise a runtime [`Value`] back into JSON (for snapshots and logs).
#[must_use]
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Record(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_set_state() {
        let input = decode(r#"{"kind":"set_state","key":"count","value":1}"#).unwrap();
        assert_eq!(
            input,
            EncodedInput::SetState {
                key: "count".into(),
                value: serde_json::json!(1),
            }
        );
    }

    #[test]
    fn decodes_dispatch_with_default_payload() {
        let input = decode(r#"{"kind":"dispatch","event_type":"click"}"#).unwrap();
        assert_eq!(
            input,
            EncodedInput::Dispatch {
                event_type: "click".into(),
                payload: serde_json::Value::Null,
            }
        );
    }

    #[test]
    fn rejects_malformed_and_unknown() {
        assert_eq!(decode("not json"), None);
        assert_eq!(decode(r#"{"kind":"resize","cols":80}"#), None);
        assert_eq!(decode(r#"{"kind":"set_state"}"#), None); // missing key
    }

    #[test]
    fn json_round_trips_through_value() {
        let json = serde_json::json!({
            "name": "x",
            "tags": ["a", "b"],
            "count": 2.5,
            "on": true,
            "gone": null,
        });
        let value = json_to_value(&json);
        assert_eq!(value_to_json(&value), json);
    }

    #[test]
    fn nested_records_become_btreemaps() {
        let value = json_to_value(&serde_json::json!({"b": 1, "a": 2}));
        let record = value.as_record().unwrap();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
