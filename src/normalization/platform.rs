use serde_json::{Map, Value};

/// Separator used for every comma-joined list column.
pub const LIST_SEPARATOR: &str = ", ";

/// Join the names of platforms flagged as available, in payload order.
pub fn platform_list(flags: &Map<String, Value>) -> String {
    flags
        .iter()
        .filter(|(_, v)| truthy(v))
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Split a joined platform column back into its platform names.
pub fn split_platforms(joined: &str) -> impl Iterator<Item = &str> {
    joined.split(',').map(str::trim).filter(|p| !p.is_empty())
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_payload_order_and_only_enabled_platforms() {
        let flags = json!({ "windows": true, "mac": false, "linux": 1 });
        let map = flags.as_object().unwrap();
        assert_eq!(platform_list(map), "windows, linux");
    }

    #[test]
    fn split_ignores_blanks() {
        let parts: Vec<_> = split_platforms("windows, mac,, ").collect();
        assert_eq!(parts, vec!["windows", "mac"]);
        assert_eq!(split_platforms("").count(), 0);
    }
}
