#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::{Path, PathBuf};

use crate::args::JsonInput;
use crate::client::CliError;

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::InputFile {
        path: path.display().to_string(),
        source,
    })
}

pub fn read_value(val: Option<String>, file: Option<PathBuf>) -> Result<String, CliError> {
    if let Some(path) = file {
        read_file(&path)
    } else if let Some(v) = val {
        Ok(v)
    } else {
        Err(CliError::InvalidInput("value required".into()))
    }
}

/// Parse the JSON document given inline or by file; it must be an object.
pub fn read_json(input: JsonInput) -> Result<serde_json::Value, CliError> {
    let raw = read_value(input.json, input.file)
        .map_err(|err| match err {
            CliError::InvalidInput(_) => {
                CliError::InvalidInput("provide a document with --json or --file".into())
            }
            other => other,
        })?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| CliError::InvalidInput(e.to_string()))?;
    if !value.is_object() {
        return Err(CliError::InvalidInput("document must be a JSON object".into()));
    }
    Ok(value)
}

pub fn parse_date_opt(val: Option<String>) -> Result<Option<String>, CliError> {
    let Some(raw) = val else {
        return Ok(None);
    };
    let format = time::macros::format_description!("[year]-[month]-[day]");
    time::Date::parse(raw.trim(), format)
        .map(|_| Some(raw.trim().to_string()))
        .map_err(|e| CliError::InvalidInput(format!("{raw}: {e}")))
}

pub fn to_value<T: serde::Serialize>(value: T) -> Result<serde_json::Value, CliError> {
    serde_json::to_value(value).map_err(|e| CliError::InvalidInput(e.to_string()))
}
