use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::sweep_grid;

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => {
            if let Some((rows, cols, cells)) = sweep_grid(res_map) {
                print_sweep_grid(res_map, rows, cols, cells);
            } else {
                print_sections(res_map);
            }
        }
        _ => print_flat_object(envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalars in one Field/Value table, then one table per nested section.
fn print_sections(map: &Map<String, Value>) {
    let scalars: Map<String, Value> = map
        .iter()
        .filter(|(_, v)| !is_section(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !scalars.is_empty() {
        print_flat_object(&scalars);
    }

    for (key, val) in map.iter().filter(|(_, v)| is_section(v)) {
        println!("\n{}:", key);
        match val {
            Value::Array(arr) => print_array_table(arr),
            Value::Object(inner) => print_sections(inner),
            _ => {}
        }
    }
}

fn is_section(value: &Value) -> bool {
    match value {
        Value::Array(arr) => matches!(arr.first(), Some(Value::Object(_))),
        // Tagged enums such as payback stay inline
        Value::Object(map) => !map.contains_key("status"),
        _ => false,
    }
}

fn print_sweep_grid(res: &Map<String, Value>, rows: &[Value], cols: &[Value], cells: &[Value]) {
    let corner = format!(
        "{} \\ {}",
        res.get("variable_1_name").map(format_value).unwrap_or_default(),
        res.get("variable_2_name").map(format_value).unwrap_or_default()
    );
    let mut builder = Builder::default();
    let mut header = vec![corner];
    header.extend(cols.iter().map(format_value));
    builder.push_record(header);

    for (row_value, row) in rows.iter().zip(cells) {
        let mut record = vec![format_value(row_value)];
        if let Value::Array(values) = row {
            record.extend(values.iter().map(|v| match v {
                Value::Null => "n/a".to_string(),
                other => format_value(other),
            }));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));

    if let Some(base) = res.get("base_case_value") {
        println!("\nBase case: {}", format_value(base));
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(map) => match (map.get("status"), map.get("months")) {
            (_, Some(months)) => format!("{} months", format_value(months)),
            (Some(status), None) => format_value(status),
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
    }
}
