pub mod financing;
pub mod savings;
pub mod sizing;

use serde::de::DeserializeOwned;

use crate::input;

pub type CommandResult = Result<serde_json::Value, Box<dyn std::error::Error>>;

/// Input from `--input`, then from piped stdin. `None` means the command
/// builds its input from flags.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Some(input::file::read_json(path)?)),
        None => input::stdin::read_stdin(),
    }
}

/// Unwrap a required flag with the usual hint.
pub fn required<T>(value: Option<T>, flag: &str) -> Result<T, Box<dyn std::error::Error>> {
    value.ok_or_else(|| format!("--{flag} is required (or provide --input)").into())
}
