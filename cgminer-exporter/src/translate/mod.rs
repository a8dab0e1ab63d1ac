//! Translation of a [`Snapshot`] into Prometheus text exposition format.
//!
//! Each response section has its own sub-translator. All of them share one
//! [`TagSet`] built from the `version` response.
//!
//! ```text
//! #CGMiner metrics export
//! # Stats
//! cgminer_stats_temp{temp="1",instance="10.0.0.5",...} 52
//! # Pools Data
//! cgminer_pool_count{instance="10.0.0.5",...} 2
//! #Pool Summary
//! cgminer_summary_elapsed{instance="10.0.0.5",...} 86400
//! ```

pub mod pools;
pub mod stats;
pub mod summary;
pub mod tags;

use std::fmt::Write;

use serde_json::{Map, Value};

use crate::client::Command;
use crate::config::TranslateConfig;
use crate::mapping::{format_labels, format_value, to_number};
use crate::poller::Snapshot;

pub use tags::{TagSet, Vendor};

/// Banner opening every rendered body.
pub const HEADER: &str = "#CGMiner metrics export\n";

/// Errors raised while translating a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Missing field '{field}' in {section} response")]
    MissingField {
        section: &'static str,
        field: String,
    },
    #[error("Field '{field}' in {section} response is not numeric: {value}")]
    InvalidValue {
        section: &'static str,
        field: String,
        value: String,
    },
}

/// Render a full snapshot.
///
/// Sections are emitted in snapshot order; `version` and `devs` contribute no
/// lines of their own. Any error aborts the render.
pub fn render(snapshot: &Snapshot, config: &TranslateConfig) -> Result<String, TranslateError> {
    let version = element(snapshot.get(Command::Version), Command::Version, "VERSION", 0)?;
    let tags = TagSet::from_version(snapshot.target(), version)?;

    let mut out = String::with_capacity(4096);
    out.push_str(HEADER);

    for command in snapshot.commands() {
        let Some(section) = snapshot.get(command) else {
            continue;
        };
        match command {
            Command::Stats => stats::render(section, &tags, &mut out)?,
            Command::Pools => pools::render(section, &tags, config, &mut out)?,
            Command::Summary => summary::render(section, &tags, &mut out)?,
            Command::Version | Command::Devs => {}
        }
    }

    Ok(out)
}

/// Write one metric line.
pub(crate) fn write_metric(out: &mut String, name: &str, labels: &[(String, String)], value: f64) {
    writeln!(out, "{}{} {}", name, format_labels(labels), format_value(value)).ok();
}

/// The object at `section[key][index]`.
pub(crate) fn element<'a>(
    section: Option<&'a Value>,
    command: Command,
    key: &str,
    index: usize,
) -> Result<&'a Map<String, Value>, TranslateError> {
    section
        .and_then(|s| s.get(key))
        .and_then(|list| list.get(index))
        .and_then(Value::as_object)
        .ok_or_else(|| TranslateError::MissingField {
            section: command.as_str(),
            field: format!("{}[{}]", key, index),
        })
}

/// A required field of a response object.
pub(crate) fn field<'a>(
    object: &'a Map<String, Value>,
    command: Command,
    name: &str,
) -> Result<&'a Value, TranslateError> {
    object.get(name).ok_or_else(|| TranslateError::MissingField {
        section: command.as_str(),
        field: name.to_string(),
    })
}

/// A required numeric field of a response object.
pub(crate) fn number(
    object: &Map<String, Value>,
    command: Command,
    name: &str,
) -> Result<f64, TranslateError> {
    let value = field(object, command, name)?;
    numeric(value, command, name)
}

/// Coerce a value to a sample or report it as invalid.
pub(crate) fn numeric(value: &Value, command: Command, name: &str) -> Result<f64, TranslateError> {
    to_number(value).ok_or_else(|| invalid(value, command, name))
}

pub(crate) fn invalid(value: &Value, command: Command, name: &str) -> TranslateError {
    TranslateError::InvalidValue {
        section: command.as_str(),
        field: name.to_string(),
        value: value.to_string(),
    }
}
