//! Output encoders for synthesized documents.
//!
//! Mapping keys are emitted in document order. Values a format cannot
//! represent are reported with the address of the construct that supplied
//! them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::synth::Document;
use crate::domain::value::{render_pointer, Value};

/// Turns a document into text.
pub trait Encoder: Send + Sync {
    fn encode(&self, document: &Document) -> DomainResult<String>;

    /// File extension without the leading dot.
    fn extension(&self) -> &'static str;
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

impl Format {
    /// Encoder for this format. JSON has no comments, so `header` only applies to YAML.
    pub fn encoder(self, header: Option<String>) -> Box<dyn Encoder> {
        match self {
            Format::Yaml => Box::new(YamlEncoder { header }),
            Format::Json => Box::new(JsonEncoder::default()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Yaml => write!(f, "yaml"),
            Format::Json => write!(f, "json"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format '{other}' (expected yaml or json)")),
        }
    }
}

/// YAML encoder with an optional comment header.
#[derive(Debug, Clone, Default)]
pub struct YamlEncoder {
    header: Option<String>,
}

impl YamlEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(header: impl Into<String>) -> Self {
        Self {
            header: Some(header.into()),
        }
    }
}

impl Encoder for YamlEncoder {
    fn encode(&self, document: &Document) -> DomainResult<String> {
        check_encodable(document)?;
        let body =
            serde_yaml::to_string(document.value()).map_err(|e| serializer_error(document, e))?;

        let mut out = String::new();
        if let Some(header) = self.header.as_deref().filter(|h| !h.is_empty()) {
            for line in header.lines() {
                out.push_str("# ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str(&body);
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "yml"
    }
}

/// JSON encoder, pretty printed by default.
#[derive(Debug, Clone)]
pub struct JsonEncoder {
    pretty: bool,
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonEncoder {
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Encoder for JsonEncoder {
    fn encode(&self, document: &Document) -> DomainResult<String> {
        check_encodable(document)?;
        let mut out = if self.pretty {
            serde_json::to_string_pretty(document.value())
        } else {
            serde_json::to_string(document.value())
        }
        .map_err(|e| serializer_error(document, e))?;
        out.push('\n');
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

fn serializer_error(document: &Document, err: impl fmt::Display) -> DomainError {
    DomainError::Encoding {
        address: document.owner_of::<String>(&[]),
        pointer: String::new(),
        reason: err.to_string(),
    }
}

/// Reject values neither format can represent faithfully.
///
/// serde_json silently writes NaN as `null` and YAML would emit `.nan`, which
/// no workflow consumer can use.
fn check_encodable(document: &Document) -> DomainResult<()> {
    let mut path = Vec::new();
    walk(document.value(), &mut path, &|value, path| match value {
        Value::Float(f) if !f.is_finite() => Err(DomainError::Encoding {
            address: document.owner_of(path),
            pointer: render_pointer(path),
            reason: format!("non-finite number {} is not representable", f),
        }),
        _ => Ok(()),
    })
}

fn walk(
    value: &Value,
    path: &mut Vec<String>,
    visit: &dyn Fn(&Value, &[String]) -> DomainResult<()>,
) -> DomainResult<()> {
    visit(value, path)?;
    match value {
        Value::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(i.to_string());
                walk(item, path, visit)?;
                path.pop();
            }
        }
        Value::Mapping(map) => {
            for (key, item) in map {
                path.push(key.clone());
                walk(item, path, visit)?;
                path.pop();
            }
        }
        _ => {}
    }
    Ok(())
}
