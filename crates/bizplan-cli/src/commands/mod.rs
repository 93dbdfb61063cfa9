pub mod capex;
pub mod cash_flow;
pub mod dashboard;
pub mod revenue;
pub mod scenarios;
pub mod valuation;

use serde::de::DeserializeOwned;

use crate::input;

/// Deserialise command input from `--input`, else from piped stdin.
pub fn load_input<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return input::file::read_input(path);
    }
    match input::stdin::read_stdin()? {
        Some(data) => Ok(serde_json::from_value(data)?),
        None => Err(format!("--input is required for {what} (or pipe JSON/YAML on stdin)").into()),
    }
}

/// Same as [`load_input`] but `None` when nothing was supplied.
pub fn load_optional_input<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return input::file::read_input(path).map(Some);
    }
    match input::stdin::read_stdin()? {
        Some(data) => Ok(Some(serde_json::from_value(data)?)),
        None => Ok(None),
    }
}
