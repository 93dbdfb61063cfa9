use serde_json::{Map, Value};

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority (also inside a
/// `valuation` or `metrics` section), then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        if let Some(val) = headline(map) {
            println!("{}", format_minimal(val));
            return;
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

const PRIORITY_KEYS: [&str; 7] = [
    "npv",
    "irr",
    "wacc",
    "base_case_value",
    "total_capex",
    "net_revenue_cagr",
    "annual_depreciation",
];

fn headline(map: &Map<String, Value>) -> Option<&Value> {
    let nested = ["valuation", "metrics"]
        .iter()
        .filter_map(|section| map.get(*section).and_then(Value::as_object));
    std::iter::once(map).chain(nested).find_map(|m| {
        PRIORITY_KEYS
            .iter()
            .filter_map(|key| m.get(*key))
            .find(|val| !val.is_null())
    })
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
