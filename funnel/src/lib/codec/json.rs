// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Structured and batch content modes.
//!
//! Structured mode carries one event as a single JSON object whose keys
//! are the wire attribute names of the event's dialect; batch mode is a
//! JSON array of such objects. Both directions are driven by the
//! [`AttributeSchema`](crate::spec::AttributeSchema) of the dialect:
//! decoding reads `specversion` (or a version-specific alias) exactly
//! once to pick the schema, then extracts every schema attribute with
//! alias fallback, turns all leftover keys into extension attributes,
//! and hands the result to the event builder for validation.
//!
//! # Examples
//!
//! ```rust
//! use funnel::codec::json;
//!
//! let body = br#"{
//!     "specversion": "1.0",
//!     "id": "1234",
//!     "source": "//example.com/app",
//!     "type": "com.example.test",
//!     "data": {"ok": true}
//! }"#;
//!
//! let event = json::decode(body).unwrap();
//! assert_eq!(event.id(), "1234");
//!
//! let reencoded = json::encode(&event).unwrap();
//! assert_eq!(json::decode_value(&reencoded).unwrap(), event);
//! ```

use std::collections::BTreeSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value as JsonValue};

use super::{is_json_media, is_text_media};
use crate::error::{EnvelopeError, MalformedEventError};
use crate::event::{Event, EventData};
use crate::spec::{DataLayout, SpecVersion};

/// Encodes one event to its structured-mode JSON object.
pub fn encode(event: &Event) -> Result<JsonValue, EnvelopeError> {
    let schema = event.spec_version().schema();
    let mut map = Map::new();

    map.insert(
        schema.version_key.to_owned(),
        JsonValue::String(event.spec_version().as_str().to_owned()),
    );

    for attr in schema.attributes() {
        let value = match attr.canonical {
            "id" => Some(JsonValue::String(event.id().to_owned())),
            "source" => Some(JsonValue::String(event.source().to_owned())),
            "type" => Some(JsonValue::String(event.event_type().to_owned())),
            "time" => event
                .time()
                .map(|t| JsonValue::String(encode_timestamp(&t))),
            "subject" => {
                event.subject().map(|s| JsonValue::String(s.to_owned()))
            }
            "datacontenttype" => event
                .data_content_type()
                .map(|s| JsonValue::String(s.to_owned())),
            "dataschema" => event
                .data_schema()
                .map(|s| JsonValue::String(s.to_owned())),
            // Extension-carried attributes (0.1's eventTypeVersion)
            // write through their wire key.
            other => event.extension(other).cloned(),
        };
        if let Some(value) = value {
            map.insert(attr.wire.to_owned(), value);
        }
    }

    match event.data() {
        EventData::None => {}
        EventData::Json(value) => {
            map.insert("data".into(), value.clone());
        }
        EventData::Text(text) => {
            map.insert("data".into(), JsonValue::String(text.clone()));
        }
        EventData::Binary(bytes) => {
            let encoded = JsonValue::String(BASE64.encode(bytes));
            match schema.data_layout {
                DataLayout::Base64Key(key) => {
                    map.insert(key.to_owned(), encoded);
                }
                DataLayout::EncodingAttribute(marker) => {
                    map.insert("data".into(), encoded);
                    map.insert(
                        marker.to_owned(),
                        JsonValue::String("base64".into()),
                    );
                }
                DataLayout::InlineBase64 => {
                    map.insert("data".into(), encoded);
                }
            }
        }
    }

    let mut extensions = Map::new();
    for (name, value) in event.extensions() {
        // Skip extensions already written as schema attributes above.
        if schema
            .lookup_canonical(name)
            .is_some_and(|attr| attr.stored_as_extension)
        {
            continue;
        }
        extensions.insert(name.to_owned(), value.clone());
    }
    match schema.extensions_key {
        Some(key) if !extensions.is_empty() => {
            map.insert(key.to_owned(), JsonValue::Object(extensions));
        }
        Some(_) => {}
        None => map.extend(extensions),
    }

    Ok(JsonValue::Object(map))
}

/// Encodes one event to structured-mode JSON bytes.
pub fn encode_bytes(event: &Event) -> Result<Vec<u8>, EnvelopeError> {
    Ok(serde_json::to_vec(&encode(event)?)?)
}

/// Decodes structured-mode JSON bytes into one event.
pub fn decode(body: &[u8]) -> Result<Event, EnvelopeError> {
    let value: JsonValue = serde_json::from_slice(body)?;
    decode_value(&value)
}

/// Decodes an already-parsed structured-mode JSON value.
pub fn decode_value(value: &JsonValue) -> Result<Event, EnvelopeError> {
    let Some(map) = value.as_object() else {
        return Err(MalformedEventError::InvalidAttribute {
            attribute: "body".into(),
            reason: "structured content mode requires a JSON object".into(),
        }
        .into());
    };

    let (version_raw, version_key) = locate_version(map).ok_or_else(|| {
        MalformedEventError::MissingAttribute {
            attribute: "specversion".into(),
        }
    })?;
    let version_str = version_raw.as_str().ok_or_else(|| {
        MalformedEventError::InvalidAttribute {
            attribute: "specversion".into(),
            reason: "must be a JSON string".into(),
        }
    })?;
    let spec_version = SpecVersion::parse(version_str)?;
    let schema = spec_version.schema();

    let mut builder = Event::builder().spec_version(spec_version);
    let mut consumed: BTreeSet<&str> = BTreeSet::new();
    consumed.insert(version_key);

    let mut content_type: Option<String> = None;
    for attr in schema.attributes() {
        let Some(raw) = map.get(attr.wire) else { continue };
        consumed.insert(attr.wire);

        // Some producers emit an explicit null for "unset". Treat it
        // as absent; a null mandatory attribute still fails as
        // missing.
        if raw.is_null() {
            continue;
        }

        if attr.stored_as_extension {
            builder = builder.extension(attr.canonical, raw.clone());
            continue;
        }

        let text = raw.as_str().ok_or_else(|| {
            MalformedEventError::InvalidAttribute {
                attribute: attr.canonical.into(),
                reason: "must be a JSON string".into(),
            }
        })?;
        builder = match attr.canonical {
            "id" => builder.id(text),
            "source" => builder.source(text),
            "type" => builder.event_type(text),
            "time" => builder.time(parse_timestamp(text)?),
            "subject" => builder.subject(text),
            "datacontenttype" => {
                content_type = Some(text.to_owned());
                builder.data_content_type(text)
            }
            "dataschema" => builder.data_schema(text),
            _ => builder,
        };
    }

    // 0.3's datacontentencoding marker flags base64-encoded data.
    let mut base64_flagged = false;
    if let DataLayout::EncodingAttribute(marker) = schema.data_layout {
        if let Some(raw) = map.get(marker) {
            consumed.insert(marker);
            let is_base64 = raw
                .as_str()
                .is_some_and(|s| s.eq_ignore_ascii_case("base64"));
            if !is_base64 {
                return Err(MalformedEventError::InvalidAttribute {
                    attribute: marker.into(),
                    reason: "unsupported content encoding".into(),
                }
                .into());
            }
            base64_flagged = true;
        }
    }

    let mut data = EventData::None;
    if let DataLayout::Base64Key(key) = schema.data_layout {
        if let Some(raw) = map.get(key) {
            consumed.insert(key);
            if map.contains_key("data") {
                return Err(MalformedEventError::InvalidAttribute {
                    attribute: "data".into(),
                    reason: format!("must not be combined with {key}"),
                }
                .into());
            }
            data = EventData::Binary(decode_base64(raw, key)?);
        }
    }
    if data.is_none() {
        if let Some(raw) = map.get("data") {
            consumed.insert("data");
            data = interpret_data(
                raw,
                content_type.as_deref(),
                base64_flagged,
                schema.data_layout,
            )?;
        }
    }
    builder = builder.data(data);

    // Everything unrecognized becomes an extension attribute; the
    // builder validates the names.
    for (key, raw) in map {
        if consumed.contains(key.as_str()) {
            continue;
        }
        if Some(key.as_str()) == schema.extensions_key {
            let Some(nested) = raw.as_object() else {
                return Err(MalformedEventError::InvalidAttribute {
                    attribute: key.clone(),
                    reason: "must be a JSON object".into(),
                }
                .into());
            };
            for (name, value) in nested {
                builder = builder.extension(name, value.clone());
            }
            continue;
        }
        builder = builder.extension(key, raw.clone());
    }

    builder.build()
}

/// Encodes events to a batch-mode JSON array, preserving order.
pub fn encode_batch(events: &[Event]) -> Result<JsonValue, EnvelopeError> {
    let items = events
        .iter()
        .map(encode)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(JsonValue::Array(items))
}

/// Encodes events to batch-mode JSON bytes.
pub fn encode_batch_bytes(events: &[Event]) -> Result<Vec<u8>, EnvelopeError> {
    Ok(serde_json::to_vec(&encode_batch(events)?)?)
}

/// Decodes batch-mode JSON bytes into events, in array order. An empty
/// array decodes to an empty vector, not an error.
pub fn decode_batch(body: &[u8]) -> Result<Vec<Event>, EnvelopeError> {
    let value: JsonValue = serde_json::from_slice(body)?;
    let Some(items) = value.as_array() else {
        return Err(MalformedEventError::InvalidAttribute {
            attribute: "body".into(),
            reason: "batch content mode requires a JSON array".into(),
        }
        .into());
    };
    items.iter().map(decode_value).collect()
}

fn locate_version<'a>(
    map: &'a Map<String, JsonValue>,
) -> Option<(&'a JsonValue, &'static str)> {
    if let Some(raw) = map.get("specversion") {
        return Some((raw, "specversion"));
    }
    for version in SpecVersion::ALL {
        let key = version.schema().version_key;
        if let Some(raw) = map.get(key) {
            return Some((raw, key));
        }
    }
    None
}

fn interpret_data(
    raw: &JsonValue,
    content_type: Option<&str>,
    base64_flagged: bool,
    layout: DataLayout,
) -> Result<EventData, EnvelopeError> {
    if base64_flagged {
        return Ok(EventData::Binary(decode_base64(raw, "data")?));
    }
    match content_type {
        // No declared content type implies JSON data.
        None => Ok(EventData::Json(raw.clone())),
        Some(ct) if is_json_media(ct) => Ok(EventData::Json(raw.clone())),
        Some(ct) if is_text_media(ct) => match raw {
            JsonValue::String(text) => Ok(EventData::Text(text.clone())),
            other => Ok(EventData::Json(other.clone())),
        },
        Some(_) => match (layout, raw) {
            // Pre-0.3 dialects carry binary payloads as bare base64
            // strings, distinguished only by the content type.
            (DataLayout::InlineBase64, JsonValue::String(_)) => {
                Ok(EventData::Binary(decode_base64(raw, "data")?))
            }
            (_, JsonValue::String(text)) => Ok(EventData::Text(text.clone())),
            (_, other) => Ok(EventData::Json(other.clone())),
        },
    }
}

fn decode_base64(
    raw: &JsonValue,
    attribute: &str,
) -> Result<bytes::Bytes, EnvelopeError> {
    let text = raw.as_str().ok_or_else(|| {
        MalformedEventError::InvalidAttribute {
            attribute: attribute.into(),
            reason: "base64 payload must be a JSON string".into(),
        }
    })?;
    let decoded = BASE64.decode(text).map_err(|_| {
        MalformedEventError::InvalidAttribute {
            attribute: attribute.into(),
            reason: "invalid base64 payload".into(),
        }
    })?;
    Ok(bytes::Bytes::from(decoded))
}

pub(crate) fn parse_timestamp(
    text: &str,
) -> Result<DateTime<Utc>, EnvelopeError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            MalformedEventError::InvalidAttribute {
                attribute: "time".into(),
                reason: "not a valid RFC 3339 timestamp".into(),
            }
            .into()
        })
}

pub(crate) fn encode_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
