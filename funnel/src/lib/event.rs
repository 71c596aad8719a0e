// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The canonical event envelope.
//!
//! [`Event`] is an immutable value object: every instance has passed
//! validation against the attribute schema of its declared spec version,
//! and no operation mutates one after construction. "Changing" an event
//! means deriving a new one through [`Event::to_builder`], which
//! re-validates on `build()`.
//!
//! # Construction
//!
//! Events are created exclusively through the builder (the codecs and
//! the legacy translator use it too):
//!
//! ```rust
//! use funnel::event::Event;
//! use funnel::spec::SpecVersion;
//! use serde_json::json;
//!
//! let event = Event::builder()
//!     .spec_version(SpecVersion::V1_0)
//!     .id("1234")
//!     .source("//example.com/app")
//!     .event_type("com.example.object.created")
//!     .data_content_type("application/json")
//!     .data(json!({"name": "thing"}))
//!     .extension("traceparent", "00-4bf92f3577b34da6a3ce929d0e0e4736")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(event.id(), "1234");
//! assert_eq!(event.extension("traceparent").unwrap(), "00-4bf92f3577b34da6a3ce929d0e0e4736");
//! assert!(event.extension("unset").is_none());
//! ```
//!
//! Deriving with overrides:
//!
//! ```rust
//! # use funnel::event::Event;
//! # use funnel::spec::SpecVersion;
//! # let event = Event::builder()
//! #     .spec_version(SpecVersion::V1_0)
//! #     .id("1234")
//! #     .source("//example.com/app")
//! #     .event_type("com.example.object.created")
//! #     .build()
//! #     .unwrap();
//! let derived = event.to_builder().subject("objects/42").build().unwrap();
//!
//! assert_eq!(derived.subject(), Some("objects/42"));
//! assert_eq!(event.subject(), None); // the original is untouched
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::error::{EnvelopeError, MalformedEventError};
use crate::spec::{
    is_uri_reference, is_valid_extension_name, AttributeKind, SpecVersion,
};

/// Payload of an event.
///
/// The concrete variant is decided by the event's `datacontenttype` and
/// the content mode it was decoded from: JSON media types parse into
/// `Json`, textual media types into `Text`, everything else stays
/// `Binary`. Equality is byte-for-byte for `Binary` and structural for
/// `Json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EventData {
    /// No payload
    #[default]
    None,
    /// Raw bytes
    Binary(Bytes),
    /// Parsed JSON tree
    Json(JsonValue),
    /// UTF-8 text
    Text(String),
}

impl EventData {
    /// Whether the event carries no payload.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Payload as a parsed JSON value, if it is one.
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Payload as text, if it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Payload as raw bytes, if it is binary.
    pub fn as_binary(&self) -> Option<&Bytes> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Serializes the payload to its on-wire bytes.
    pub fn to_bytes(&self) -> Result<Bytes, EnvelopeError> {
        match self {
            Self::None => Ok(Bytes::new()),
            Self::Binary(bytes) => Ok(bytes.clone()),
            Self::Json(value) => {
                Ok(Bytes::from(serde_json::to_vec(value).map_err(
                    |e| EnvelopeError::from(e),
                )?))
            }
            Self::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
        }
    }
}

impl From<JsonValue> for EventData {
    fn from(value: JsonValue) -> Self {
        Self::Json(value)
    }
}

impl From<String> for EventData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for EventData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Bytes> for EventData {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

impl From<Vec<u8>> for EventData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(bytes))
    }
}

/// One CloudEvents-conformant occurrence.
///
/// All mandatory attributes for the declared [`SpecVersion`] are present
/// and non-empty; extension names are lowercase alphanumeric and never
/// collide with core attribute names. Two events are equal iff every
/// core attribute, extension attribute and the payload are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    spec_version: SpecVersion,
    id: String,
    source: String,
    event_type: String,
    time: Option<DateTime<Utc>>,
    data_content_type: Option<String>,
    data_schema: Option<String>,
    subject: Option<String>,
    data: EventData,
    extensions: BTreeMap<String, JsonValue>,
}

impl Event {
    /// Creates a new event builder.
    pub fn builder() -> EventBuilder {
        EventBuilder::default()
    }

    /// The dialect this event conforms to.
    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version
    }

    /// The `id` attribute.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The `source` attribute (a URI-reference).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The `type` attribute.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The `time` attribute, normalized to UTC.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    /// The `datacontenttype` attribute.
    pub fn data_content_type(&self) -> Option<&str> {
        self.data_content_type.as_deref()
    }

    /// The `dataschema` attribute.
    pub fn data_schema(&self) -> Option<&str> {
        self.data_schema.as_deref()
    }

    /// The `subject` attribute.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The payload.
    pub fn data(&self) -> &EventData {
        &self.data
    }

    /// All extension attributes in name order.
    pub fn extensions(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.extensions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up an extension attribute by name. Unset names yield
    /// `None`, never an error.
    pub fn extension(&self, name: &str) -> Option<&JsonValue> {
        self.extensions.get(name)
    }

    /// Returns a builder primed with every field of this event, for
    /// deriving a new event with overrides. The result re-validates on
    /// `build()`; this event is never mutated.
    pub fn to_builder(&self) -> EventBuilder {
        EventBuilder {
            spec_version: Some(self.spec_version),
            id: Some(self.id.clone()),
            source: Some(self.source.clone()),
            event_type: Some(self.event_type.clone()),
            time: self.time,
            data_content_type: self.data_content_type.clone(),
            data_schema: self.data_schema.clone(),
            subject: self.subject.clone(),
            data: self.data.clone(),
            extensions: self.extensions.clone(),
        }
    }
}

/// Builder for [`Event`].
///
/// `build()` is the single validation point: mandatory attributes for
/// the declared spec version, URI-reference syntax for `source` and
/// `dataschema`, extension-name syntax, and collision checks all happen
/// there and nowhere else.
#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    spec_version: Option<SpecVersion>,
    id: Option<String>,
    source: Option<String>,
    event_type: Option<String>,
    time: Option<DateTime<Utc>>,
    data_content_type: Option<String>,
    data_schema: Option<String>,
    subject: Option<String>,
    data: EventData,
    extensions: BTreeMap<String, JsonValue>,
}

impl EventBuilder {
    /// Sets the spec version (mandatory).
    pub fn spec_version(mut self, version: SpecVersion) -> Self {
        self.spec_version = Some(version);
        self
    }

    /// Sets the `id` attribute (mandatory).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the `source` attribute (mandatory, URI-reference).
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the `type` attribute (mandatory).
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the `time` attribute.
    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Sets the `datacontenttype` attribute.
    pub fn data_content_type(mut self, value: impl Into<String>) -> Self {
        self.data_content_type = Some(value.into());
        self
    }

    /// Sets the `dataschema` attribute.
    pub fn data_schema(mut self, value: impl Into<String>) -> Self {
        self.data_schema = Some(value.into());
        self
    }

    /// Sets the `subject` attribute.
    pub fn subject(mut self, value: impl Into<String>) -> Self {
        self.subject = Some(value.into());
        self
    }

    /// Sets the payload.
    pub fn data(mut self, data: impl Into<EventData>) -> Self {
        self.data = data.into();
        self
    }

    /// Sets an extension attribute. Setting the same name again
    /// overrides the previous value.
    pub fn extension(
        mut self,
        name: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.extensions.insert(name.into(), value.into());
        self
    }

    /// Validates and builds the event.
    ///
    /// # Errors
    ///
    /// [`MalformedEventError`] naming the attribute at fault when a
    /// mandatory attribute is missing or empty, a value fails its
    /// syntactic check, or an extension name is invalid.
    pub fn build(self) -> Result<Event, EnvelopeError> {
        let spec_version = self.spec_version.ok_or_else(|| {
            MalformedEventError::MissingAttribute {
                attribute: "specversion".into(),
            }
        })?;
        let schema = spec_version.schema();

        let id = require(self.id, "id")?;
        let source = require(self.source, "source")?;
        let event_type = require(self.event_type, "type")?;

        // Optional attributes must be defined by the declared dialect.
        if self.subject.is_some()
            && schema.lookup_canonical("subject").is_none()
        {
            return Err(MalformedEventError::UndefinedAttribute {
                attribute: "subject".into(),
                version: spec_version.to_string(),
            }
            .into());
        }

        // Syntactic checks driven by the schema's value kinds.
        for (canonical, value) in [
            ("source", Some(source.as_str())),
            ("dataschema", self.data_schema.as_deref()),
        ] {
            let Some(value) = value else { continue };
            let Some(attr) = schema.lookup_canonical(canonical) else {
                continue;
            };
            if attr.kind == AttributeKind::UriRef && !is_uri_reference(value)
            {
                return Err(MalformedEventError::InvalidAttribute {
                    attribute: canonical.into(),
                    reason: "not a valid URI-reference".into(),
                }
                .into());
            }
        }

        for name in self.extensions.keys() {
            if !is_valid_extension_name(name) {
                return Err(MalformedEventError::InvalidExtensionName {
                    name: name.clone(),
                    reason: "must match ^[a-z0-9]+$".into(),
                }
                .into());
            }
            if schema.is_reserved_name(name) {
                return Err(MalformedEventError::InvalidExtensionName {
                    name: name.clone(),
                    reason: "collides with a core attribute name".into(),
                }
                .into());
            }
        }

        Ok(Event {
            spec_version,
            id,
            source,
            event_type,
            time: self.time,
            data_content_type: self.data_content_type,
            data_schema: self.data_schema,
            subject: self.subject,
            data: self.data,
            extensions: self.extensions,
        })
    }
}

fn require(
    value: Option<String>,
    attribute: &str,
) -> Result<String, MalformedEventError> {
    match value {
        None => Err(MalformedEventError::MissingAttribute {
            attribute: attribute.into(),
        }),
        Some(v) if v.is_empty() => Err(MalformedEventError::EmptyAttribute {
            attribute: attribute.into(),
        }),
        Some(v) => Ok(v),
    }
}
