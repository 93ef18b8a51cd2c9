use crate::command::split_command;
use crate::error::{CompDbError, Result};
use serde::{Deserialize, Serialize};

/// One raw `compile_commands.json` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRecord {
    pub file: String,
    pub directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl CompileRecord {
    /// The argument vector. A non-empty `arguments` array wins over `command`,
    /// which is split with shell quoting rules.
    pub fn argv(&self, index: usize) -> Result<Vec<String>> {
        match (&self.arguments, &self.command) {
            (Some(arguments), _) if !arguments.is_empty() => Ok(arguments.clone()),
            (_, Some(command)) => split_command(command).map_err(|err| {
                CompDbError::invalid_record(index, format!("cannot split `command`: {err}"))
            }),
            (Some(arguments), None) => Ok(arguments.clone()),
            (None, None) => Err(CompDbError::invalid_record(
                index,
                "missing `command` or `arguments`",
            )),
        }
    }
}

/// Parse the top-level JSON array, reporting the first bad record by index.
pub fn parse_records(json: &str) -> Result<Vec<CompileRecord>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            if !value.is_object() {
                return Err(CompDbError::invalid_record(index, "record is not an object"));
            }
            serde_json::from_value(value)
                .map_err(|err| CompDbError::invalid_record(index, err.to_string()))
        })
        .collect()
}
