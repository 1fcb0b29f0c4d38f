pub mod compute;
pub mod rates;
pub mod stats;
pub mod summary;

use aligner_costing_core::rates::YearlyRateTable;
use aligner_costing_core::types::Treatment;

use crate::input;

/// Load treatments from a file, or from stdin when piped.
pub(crate) fn load_treatments(
    path: &Option<String>,
) -> Result<Vec<Treatment>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return input::file::read_document(path);
    }
    if let Some(value) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(value)?);
    }
    Err("--treatments is required (or pipe a JSON array via stdin)".into())
}

/// Load a rates file; an absent file means the built-in defaults apply to
/// every year.
pub(crate) fn load_rates(
    path: Option<&str>,
) -> Result<YearlyRateTable, Box<dyn std::error::Error>> {
    match path {
        Some(path) => input::file::read_document(path),
        None => Ok(YearlyRateTable::new()),
    }
}
