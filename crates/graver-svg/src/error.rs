//! Error handling for the SVG parsing subsystem.
//!
//! Parse failures are surfaced eagerly: a malformed document, curve string
//! or transform stops the conversion instead of producing a partial path.
//! The one geometric failure mode is the endpoint arc whose radii cannot be
//! grown into a feasible ellipse.

use thiserror::Error;

/// SVG subsystem error type.
#[derive(Error, Debug)]
pub enum SvgError {
    /// The document could not be read from disk
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path of the file that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed XML
    #[error("Malformed SVG document: {0}")]
    Xml(#[from] roxmltree::Error),

    /// A curve command string ('d' attribute) could not be parsed
    #[error("Malformed curve data: {reason}")]
    MalformedCurve {
        /// Why the curve string was rejected.
        reason: String,
    },

    /// No ellipse with the given (or grown) radii connects the endpoints
    #[error("Cannot find suitable arc radii to connect endpoints")]
    InfeasibleArc,

    /// A transform attribute names an unsupported operation
    #[error("Invalid transform encountered: {name}")]
    UnknownTransform {
        /// The offending operation name.
        name: String,
    },

    /// The requested layer does not exist in the document
    #[error("Cannot find layer: {name}")]
    LayerNotFound {
        /// The layer name that was looked up.
        name: String,
    },

    /// A required element attribute is missing or unparsable
    #[error("Missing or invalid attribute '{attribute}' on <{element}>")]
    BadAttribute {
        /// Element tag name.
        element: String,
        /// Attribute name.
        attribute: String,
    },
}

impl SvgError {
    /// Shorthand for a `MalformedCurve` error.
    pub fn curve(reason: impl Into<String>) -> Self {
        Self::MalformedCurve {
            reason: reason.into(),
        }
    }

    /// Shorthand for a `BadAttribute` error.
    pub fn attribute(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::BadAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }
}

/// Convenience alias for SVG parsing results.
pub type Result<T> = std::result::Result<T, SvgError>;
