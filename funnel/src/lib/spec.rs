// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-version attribute schemas.
//!
//! Each supported CloudEvents dialect is described by a static
//! [`AttributeSchema`]: its mandatory and optional core attributes, the
//! wire key every attribute uses in that dialect, and how a binary
//! payload is carried in structured mode. The codecs are driven entirely
//! by these descriptors - a dialect is selected exactly once, via
//! [`SpecVersion::parse`], and no version check appears anywhere else.
//!
//! The schemas are `'static` and read-only, safe for unsynchronized
//! concurrent reads from any number of worker threads.
//!
//! # Examples
//!
//! ```rust
//! use funnel::spec::SpecVersion;
//!
//! let version = SpecVersion::parse("1.0").unwrap();
//! let schema = version.schema();
//!
//! assert_eq!(schema.version_key, "specversion");
//! assert!(schema.lookup_wire("datacontenttype").is_some());
//!
//! // "0.1" spells its attributes differently
//! let old = SpecVersion::parse("0.1").unwrap().schema();
//! assert_eq!(old.version_key, "cloudEventsVersion");
//! assert_eq!(old.lookup_canonical("id").unwrap().wire, "eventID");
//! ```

use std::fmt;

use crate::constants::header::ATTRIBUTE_PREFIX;
use crate::error::UnsupportedSpecVersionError;

/// Supported CloudEvents spec dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecVersion {
    /// CloudEvents 0.1 (camelCase attribute names)
    V0_1,
    /// CloudEvents 0.2
    V0_2,
    /// CloudEvents 0.3
    V0_3,
    /// CloudEvents 1.0
    V1_0,
}

impl SpecVersion {
    /// All supported dialects, oldest first.
    pub const ALL: [SpecVersion; 4] =
        [Self::V0_1, Self::V0_2, Self::V0_3, Self::V1_0];

    /// Canonical version string as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V0_1 => "0.1",
            Self::V0_2 => "0.2",
            Self::V0_3 => "0.3",
            Self::V1_0 => "1.0",
        }
    }

    /// Resolves a wire version string to a dialect.
    ///
    /// The match is exact: anything outside the supported set fails with
    /// [`UnsupportedSpecVersionError`] carrying the offending string.
    pub fn parse(value: &str) -> Result<Self, UnsupportedSpecVersionError> {
        match value {
            "0.1" => Ok(Self::V0_1),
            "0.2" => Ok(Self::V0_2),
            "0.3" => Ok(Self::V0_3),
            "1.0" => Ok(Self::V1_0),
            other => Err(UnsupportedSpecVersionError::new(other)),
        }
    }

    /// Returns the static schema descriptor for this dialect.
    pub fn schema(&self) -> &'static AttributeSchema {
        match self {
            Self::V0_1 => &SCHEMA_V0_1,
            Self::V0_2 => &SCHEMA_V0_2,
            Self::V0_3 => &SCHEMA_V0_3,
            Self::V1_0 => &SCHEMA_V1_0,
        }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value shape of a core attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Opaque non-empty string
    String,
    /// URI-reference (syntactic check only)
    UriRef,
    /// RFC 3339 timestamp
    Timestamp,
    /// MIME media type
    MimeType,
}

/// One core attribute as a given dialect spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    /// Canonical (1.0) attribute name used throughout this crate.
    pub canonical: &'static str,
    /// Wire key in this dialect's structured JSON representation.
    pub wire: &'static str,
    /// Value shape.
    pub kind: AttributeKind,
    /// Attributes carried as extensions on the event rather than as a
    /// dedicated field (e.g. 0.1's `eventTypeVersion`).
    pub stored_as_extension: bool,
}

impl AttributeSpec {
    const fn new(
        canonical: &'static str,
        wire: &'static str,
        kind: AttributeKind,
    ) -> Self {
        Self {
            canonical,
            wire,
            kind,
            stored_as_extension: false,
        }
    }

    const fn extension(
        canonical: &'static str,
        wire: &'static str,
        kind: AttributeKind,
    ) -> Self {
        Self {
            canonical,
            wire,
            kind,
            stored_as_extension: true,
        }
    }

    /// Binary-mode header name for this attribute (`ce-` + lowercase
    /// wire key).
    pub fn header(&self) -> String {
        format!("{ATTRIBUTE_PREFIX}{}", self.wire.to_ascii_lowercase())
    }
}

/// How a dialect carries a binary payload in structured mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLayout {
    /// Base64 string under a dedicated key (`data_base64` in 1.0).
    Base64Key(&'static str),
    /// Base64 string under `data`, flagged by a marker attribute
    /// (`datacontentencoding` in 0.3).
    EncodingAttribute(&'static str),
    /// Base64 string under `data`, no marker (0.1/0.2); the content
    /// type decides the interpretation.
    InlineBase64,
}

/// Static descriptor of one dialect.
#[derive(Debug)]
pub struct AttributeSchema {
    /// The dialect this schema describes.
    pub version: SpecVersion,
    /// Wire key holding the version string.
    pub version_key: &'static str,
    /// Mandatory core attributes.
    pub required: &'static [AttributeSpec],
    /// Optional core attributes.
    pub optional: &'static [AttributeSpec],
    /// Binary-payload carrier in structured mode.
    pub data_layout: DataLayout,
    /// Key nesting extension attributes, if the dialect uses one.
    pub extensions_key: Option<&'static str>,
}

impl AttributeSchema {
    /// All core attributes, mandatory first.
    pub fn attributes(&self) -> impl Iterator<Item = &'static AttributeSpec> {
        self.required.iter().chain(self.optional.iter())
    }

    /// Finds an attribute by its wire key (exact match).
    pub fn lookup_wire(&self, key: &str) -> Option<&'static AttributeSpec> {
        self.attributes().find(|attr| attr.wire == key)
    }

    /// Finds an attribute by its canonical name.
    pub fn lookup_canonical(
        &self,
        name: &str,
    ) -> Option<&'static AttributeSpec> {
        self.attributes().find(|attr| attr.canonical == name)
    }

    /// Binary-mode header name carrying the version string.
    pub fn version_header(&self) -> String {
        format!("{ATTRIBUTE_PREFIX}{}", self.version_key.to_ascii_lowercase())
    }

    /// Whether `name` collides (case-insensitively) with a core
    /// attribute name, a wire spelling, the version key, or a data key
    /// of this dialect. Extension attributes must not use such names.
    pub fn is_reserved_name(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        if name == "data" || name == "data_base64" || name == "specversion" {
            return true;
        }
        if name == self.version_key.to_ascii_lowercase() {
            return true;
        }
        if let DataLayout::EncodingAttribute(marker) = self.data_layout {
            if name == marker {
                return true;
            }
        }
        if let Some(key) = self.extensions_key {
            if name == key {
                return true;
            }
        }
        self.attributes().any(|attr| {
            !attr.stored_as_extension
                && (attr.canonical == name
                    || attr.wire.to_ascii_lowercase() == name)
        })
    }
}

static SCHEMA_V1_0: AttributeSchema = AttributeSchema {
    version: SpecVersion::V1_0,
    version_key: "specversion",
    required: &[
        AttributeSpec::new("id", "id", AttributeKind::String),
        AttributeSpec::new("source", "source", AttributeKind::UriRef),
        AttributeSpec::new("type", "type", AttributeKind::String),
    ],
    optional: &[
        AttributeSpec::new("time", "time", AttributeKind::Timestamp),
        AttributeSpec::new("subject", "subject", AttributeKind::String),
        AttributeSpec::new(
            "datacontenttype",
            "datacontenttype",
            AttributeKind::MimeType,
        ),
        AttributeSpec::new("dataschema", "dataschema", AttributeKind::UriRef),
    ],
    data_layout: DataLayout::Base64Key("data_base64"),
    extensions_key: None,
};

static SCHEMA_V0_3: AttributeSchema = AttributeSchema {
    version: SpecVersion::V0_3,
    version_key: "specversion",
    required: &[
        AttributeSpec::new("id", "id", AttributeKind::String),
        AttributeSpec::new("source", "source", AttributeKind::UriRef),
        AttributeSpec::new("type", "type", AttributeKind::String),
    ],
    optional: &[
        AttributeSpec::new("time", "time", AttributeKind::Timestamp),
        AttributeSpec::new("subject", "subject", AttributeKind::String),
        AttributeSpec::new(
            "datacontenttype",
            "datacontenttype",
            AttributeKind::MimeType,
        ),
        AttributeSpec::new("dataschema", "schemaurl", AttributeKind::UriRef),
    ],
    data_layout: DataLayout::EncodingAttribute("datacontentencoding"),
    extensions_key: None,
};

static SCHEMA_V0_2: AttributeSchema = AttributeSchema {
    version: SpecVersion::V0_2,
    version_key: "specversion",
    required: &[
        AttributeSpec::new("id", "id", AttributeKind::String),
        AttributeSpec::new("source", "source", AttributeKind::UriRef),
        AttributeSpec::new("type", "type", AttributeKind::String),
    ],
    optional: &[
        AttributeSpec::new("time", "time", AttributeKind::Timestamp),
        AttributeSpec::new(
            "datacontenttype",
            "contenttype",
            AttributeKind::MimeType,
        ),
        AttributeSpec::new("dataschema", "schemaurl", AttributeKind::UriRef),
    ],
    data_layout: DataLayout::InlineBase64,
    extensions_key: None,
};

static SCHEMA_V0_1: AttributeSchema = AttributeSchema {
    version: SpecVersion::V0_1,
    version_key: "cloudEventsVersion",
    required: &[
        AttributeSpec::new("id", "eventID", AttributeKind::String),
        AttributeSpec::new("source", "source", AttributeKind::UriRef),
        AttributeSpec::new("type", "eventType", AttributeKind::String),
    ],
    optional: &[
        AttributeSpec::new("time", "eventTime", AttributeKind::Timestamp),
        AttributeSpec::new(
            "datacontenttype",
            "contentType",
            AttributeKind::MimeType,
        ),
        AttributeSpec::new("dataschema", "schemaURL", AttributeKind::UriRef),
        AttributeSpec::extension(
            "eventtypeversion",
            "eventTypeVersion",
            AttributeKind::String,
        ),
    ],
    data_layout: DataLayout::InlineBase64,
    extensions_key: Some("extensions"),
};

/// Checks an extension attribute name against `^[a-z0-9]+$`.
pub fn is_valid_extension_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Syntactic URI-reference check per RFC 3986's character set.
///
/// The value stays opaque beyond this: no scheme or path semantics are
/// enforced, and relative references are accepted.
pub(crate) fn is_uri_reference(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| {
            c.is_ascii_graphic()
                && !matches!(
                    c,
                    '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`'
                )
        })
}
