//! Errors raised while reading or writing annotation documents.

use thiserror::Error;

/// Why an annotation document could not be read or written.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Polygon document is not valid JSON or does not match the record layout
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Box document is not well-formed XML
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Well-formed input that is not an annotation document
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// What was wrong with the document
        message: String,
    },

    /// Document ended before an element was closed
    #[error("Unclosed element <{name}>")]
    UnclosedElement {
        /// Tag name of the open element
        name: String,
    },

    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// Coordinate text that does not parse as a number
    #[error("Invalid coordinates: {message}")]
    InvalidCoordinates {
        /// Offending values
        message: String,
    },

    /// Serializing on top of a baseline parsed by the other codec
    #[error("{codec} cannot write on top of a {found} document")]
    DocumentMismatch {
        /// Id of the codec asked to write
        codec: &'static str,
        /// Kind of baseline it was handed
        found: &'static str,
    },
}

impl FormatError {
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_coordinates(message: impl Into<String>) -> Self {
        Self::InvalidCoordinates {
            message: message.into(),
        }
    }
}
