pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Per-year rows of a result: `years`, `schedule`, or the economic series.
pub(crate) fn year_rows(result: &Map<String, Value>) -> Option<&Vec<Value>> {
    ["years", "schedule"]
        .iter()
        .find_map(|key| result.get(*key).and_then(Value::as_array))
        .or_else(|| {
            result
                .get("economic")
                .and_then(|e| e.get("years"))
                .and_then(Value::as_array)
        })
}

/// Sweep grid of a sensitivity result: row values, column values, cells.
pub(crate) fn sweep_grid(
    result: &Map<String, Value>,
) -> Option<(&Vec<Value>, &Vec<Value>, &Vec<Value>)> {
    Some((
        result.get("variable_1_values")?.as_array()?,
        result.get("variable_2_values")?.as_array()?,
        result.get("matrix")?.as_array()?,
    ))
}
