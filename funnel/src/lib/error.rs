// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error types for event decoding, translation and dispatch.
//!
//! All errors are terminal for the request being processed: nothing in
//! this crate retries, and nothing falls back to a default event. The
//! decision to retry, log, or map an error to an HTTP status belongs to
//! the server layer consuming this crate.
//!
//! # Error Categories
//!
//! - [`MalformedEventError`] - a mandatory attribute is missing, empty,
//!   or syntactically invalid
//! - [`UnsupportedSpecVersionError`] - a version key is present but not
//!   one of the supported dialects
//! - [`InvalidJsonError`] - the body is not parseable JSON where a
//!   JSON-based mode was selected
//! - [`AmbiguousEncodingError`] - no content mode could be determined
//! - [`UnknownLegacyEventError`] - a legacy body matched no mapping rule
//! - [`UnrecognizedRequestError`] - no dispatch rule applied
//!
//! # Examples
//!
//! ```rust
//! use funnel::error::{EnvelopeError, MalformedEventError};
//!
//! let err: EnvelopeError = MalformedEventError::MissingAttribute {
//!     attribute: "id".into(),
//! }
//! .into();
//!
//! assert!(matches!(err, EnvelopeError::Malformed(_)));
//! ```

use std::fmt;

use thiserror::Error;

/// Root error type for all operations in this crate.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// A mandatory attribute is missing, empty, or of the wrong shape
    #[error("Malformed event: {0}")]
    Malformed(#[from] MalformedEventError),

    /// A version key is present but names an unsupported dialect
    #[error("{0}")]
    SpecVersion(#[from] UnsupportedSpecVersionError),

    /// The body is not parseable JSON
    #[error("{0}")]
    Json(#[from] InvalidJsonError),

    /// Neither structured/batch content type nor minimum binary headers
    #[error("{0}")]
    Encoding(#[from] AmbiguousEncodingError),

    /// A legacy body matched no (service, type) mapping rule
    #[error("{0}")]
    Legacy(#[from] UnknownLegacyEventError),

    /// None of the dispatch rules applied
    #[error("{0}")]
    Unrecognized(#[from] UnrecognizedRequestError),

    /// Errors that don't fit the categories above
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Validation failures raised while constructing or decoding an event.
///
/// Every variant names the attribute at fault so callers can surface a
/// precise message without inspecting the input themselves.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedEventError {
    /// A mandatory attribute for the declared spec version is absent
    #[error("Missing mandatory attribute: {attribute}")]
    MissingAttribute { attribute: String },

    /// A mandatory attribute is present but empty
    #[error("Mandatory attribute is empty: {attribute}")]
    EmptyAttribute { attribute: String },

    /// An attribute value has the wrong syntactic shape
    #[error("Invalid value for attribute {attribute}: {reason}")]
    InvalidAttribute { attribute: String, reason: String },

    /// An extension attribute name is not lowercase alphanumeric, is
    /// duplicated, or collides with a core attribute name
    #[error("Invalid extension attribute name: {name} ({reason})")]
    InvalidExtensionName { name: String, reason: String },

    /// An attribute was supplied that the declared spec version does
    /// not define
    #[error("Attribute {attribute} is not defined by spec version {version}")]
    UndefinedAttribute { attribute: String, version: String },

    /// The request body exceeds the accepted size limit
    #[error("Body too large: {size} bytes (max: {max} bytes)")]
    BodyTooLarge { size: usize, max: usize },
}

/// The version key named a dialect this crate does not speak.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported spec version: \"{version}\"")]
pub struct UnsupportedSpecVersionError {
    /// The offending version string, verbatim from the wire.
    pub version: String,
}

impl UnsupportedSpecVersionError {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

/// JSON parsing failed where a JSON-based content mode was selected.
///
/// The display message comes from `serde_json` and describes the parse
/// position, never the body content, so it is safe to log.
#[derive(Error, Debug)]
#[error("Invalid JSON body: {0}")]
pub struct InvalidJsonError(#[source] pub serde_json::Error);

impl From<serde_json::Error> for EnvelopeError {
    fn from(err: serde_json::Error) -> Self {
        EnvelopeError::Json(InvalidJsonError(err))
    }
}

/// No content mode could be determined from the request headers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousEncodingError {
    /// The Content-Type the request carried, if any.
    pub content_type: Option<String>,
}

impl fmt::Display for AmbiguousEncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content_type {
            Some(ct) => write!(
                f,
                "Ambiguous encoding: content type \"{ct}\" is not a \
                 CloudEvents media type and the minimum binary-mode \
                 headers are absent"
            ),
            None => write!(
                f,
                "Ambiguous encoding: no content type and no binary-mode \
                 headers present"
            ),
        }
    }
}

/// A legacy body was recognized as non-CloudEvents JSON but no mapping
/// rule matches its (service, event type) pair.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No legacy mapping for service \"{service}\", type \"{event_type}\"")]
pub struct UnknownLegacyEventError {
    pub service: String,
    pub event_type: String,
}

/// None of the dispatch rules applied to the request.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error(
    "Request matched no CloudEvents content mode and no legacy payload shape"
)]
pub struct UnrecognizedRequestError;
