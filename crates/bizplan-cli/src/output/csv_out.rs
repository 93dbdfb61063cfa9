use serde_json::{Map, Value};
use std::io;

use super::{sweep_grid, year_rows};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                if let Some((rows, cols, cells)) = sweep_grid(result) {
                    write_grid_csv(&mut wtr, rows, cols, cells);
                } else if let Some(years) = year_rows(result) {
                    write_array_csv(&mut wtr, years);
                } else {
                    write_fields_csv(&mut wtr, result);
                }
            }
            _ => write_fields_csv(&mut wtr, map),
        },
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_grid_csv(
    wtr: &mut csv::Writer<io::StdoutLock<'_>>,
    rows: &[Value],
    cols: &[Value],
    cells: &[Value],
) {
    let mut header = vec![String::new()];
    header.extend(cols.iter().map(format_csv_value));
    let _ = wtr.write_record(&header);

    for (row_value, row) in rows.iter().zip(cells) {
        let mut record = vec![format_csv_value(row_value)];
        if let Value::Array(values) = row {
            record.extend(values.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
