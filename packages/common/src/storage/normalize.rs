use serde_json::Value;

/// Turn the top-level JSON of a stored file into its record list.
///
/// Rules, first match wins: a top-level array; an object's `records` array;
/// an object's `data` array; otherwise the whole value as a single record.
pub fn normalize_records(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if matches!(map.get("records"), Some(Value::Array(_))) {
                if let Some(Value::Array(items)) = map.remove("records") {
                    return items;
                }
            }
            if matches!(map.get("data"), Some(Value::Array(_))) {
                if let Some(Value::Array(items)) = map.remove("data") {
                    return items;
                }
            }
            vec![Value::Object(map)]
        }
        other => vec![other],
    }
}
