use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    InvertedBounds,
    MissingField,
    InvalidValue,
    DuplicateId,
    DanglingZoneReference,
    UnknownDefaultZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentResource {
    Zones,
    Species,
}

impl ContentResource {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Zones => "zones",
            Self::Species => "species",
        }
    }
}

/// A non-fatal problem with a single zone or species record. The offending
/// record (or rule) is dropped and loading continues with the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentIssue {
    pub code: ContentErrorCode,
    pub resource: ContentResource,
    pub record_index: Option<usize>,
    pub record_id: Option<String>,
    pub message: String,
}

impl ContentIssue {
    pub(crate) fn new(
        code: ContentErrorCode,
        resource: ContentResource,
        record_index: Option<usize>,
        record_id: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            resource,
            record_index,
            record_id: record_id.map(ToString::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for ContentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {} ({}", self.code, self.message, self.resource.as_token())?;
        if let Some(index) = self.record_index {
            write!(f, ", index={index}")?;
        }
        if let Some(id) = &self.record_id {
            write!(f, ", id={id}")?;
        }
        write!(f, ")")
    }
}

impl std::error::Error for ContentIssue {}

/// Decodes one element of a resource array on its own, so a schema error
/// costs only that record. `prefix` is the element's path in the document.
pub(crate) fn decode_record<T: DeserializeOwned>(
    value: Value,
    resource: ContentResource,
    index: usize,
    prefix: &str,
) -> Result<T, ContentIssue> {
    let record_id = value.get("id").and_then(Value::as_str).map(str::to_string);
    serde_path_to_error::deserialize::<_, T>(value).map_err(|error| {
        let path = error.path().to_string();
        let field_path = if path.is_empty() || path == "." {
            prefix.to_string()
        } else {
            format!("{prefix}.{path}")
        };
        let source = error.into_inner();
        let code = if source.to_string().starts_with("missing field") {
            ContentErrorCode::MissingField
        } else {
            ContentErrorCode::InvalidValue
        };
        ContentIssue::new(
            code,
            resource,
            Some(index),
            record_id.as_deref(),
            format!("{field_path}: {source}"),
        )
    })
}
