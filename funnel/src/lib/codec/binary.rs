// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Binary content mode.
//!
//! In binary mode every attribute travels in its own header - the `ce-`
//! prefix followed by the dialect's lowercase wire name (`ce-id`,
//! `ce-source`, `ce-specversion`, ...) - while the body is the raw
//! payload and `Content-Type` describes it. Header matching is
//! case-insensitive. Any `ce-*` header that is not a core attribute of
//! the selected dialect becomes an extension attribute.

use std::collections::BTreeSet;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use serde_json::Value as JsonValue;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use super::json::{encode_timestamp, parse_timestamp};
use super::{is_json_media, is_text_media};
use crate::constants::header::{ATTRIBUTE_PREFIX, CONTENT_TYPE};
use crate::error::{EnvelopeError, MalformedEventError};
use crate::event::{Event, EventData};
use crate::spec::{DataLayout, SpecVersion};

/// Decodes a binary-mode request into one event.
///
/// The body is interpreted per the `Content-Type` header: JSON media
/// types (or no header at all) parse into a JSON payload, `text/*`
/// into text, anything else stays raw bytes. An empty body decodes to
/// no payload.
pub fn decode(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Event, EnvelopeError> {
    let version_str = version_header_value(headers)?.ok_or_else(|| {
        MalformedEventError::MissingAttribute {
            attribute: "specversion".into(),
        }
    })?;
    let spec_version = SpecVersion::parse(&version_str)?;
    let schema = spec_version.schema();

    let mut builder = Event::builder().spec_version(spec_version);

    // Core attribute headers, so the extension sweep below skips them.
    let mut known: BTreeSet<String> = SpecVersion::ALL
        .iter()
        .map(|v| v.schema().version_header())
        .collect();
    known.insert(format!("{ATTRIBUTE_PREFIX}specversion"));

    // Dialects with an encoding marker accept it as a header too.
    let mut base64_flagged = false;
    if let DataLayout::EncodingAttribute(marker) = schema.data_layout {
        let name = format!("{ATTRIBUTE_PREFIX}{marker}");
        if let Some(raw) = headers.get(name.as_str()) {
            let text = header_text(raw, marker)?;
            if !text.eq_ignore_ascii_case("base64") {
                return Err(MalformedEventError::InvalidAttribute {
                    attribute: marker.into(),
                    reason: "unsupported content encoding".into(),
                }
                .into());
            }
            base64_flagged = true;
        }
        known.insert(name);
    }

    for attr in schema.attributes() {
        let name = attr.header();
        known.insert(name.clone());

        let Some(raw) = headers.get(name.as_str()) else { continue };
        let text = header_text(raw, attr.canonical)?;

        if attr.stored_as_extension {
            builder = builder
                .extension(attr.canonical, JsonValue::String(text.into()));
            continue;
        }
        builder = match attr.canonical {
            "id" => builder.id(text),
            "source" => builder.source(text),
            "type" => builder.event_type(text),
            "time" => builder.time(parse_timestamp(text)?),
            "subject" => builder.subject(text),
            "dataschema" => builder.data_schema(text),
            // datacontenttype travels in Content-Type, not ce-*
            _ => builder,
        };
    }

    let content_type = match headers.get(CONTENT_TYPE) {
        Some(raw) => Some(header_text(raw, "datacontenttype")?.to_owned()),
        None => None,
    };
    if let Some(ct) = &content_type {
        builder = builder.data_content_type(ct);
    }

    for (name, raw) in headers {
        let name = name.as_str();
        let Some(ext) = name.strip_prefix(ATTRIBUTE_PREFIX) else {
            continue;
        };
        if known.contains(name) {
            continue;
        }
        let text = header_text(raw, ext)?;
        builder =
            builder.extension(ext, JsonValue::String(text.to_owned()));
    }

    builder = builder.data(interpret_body(
        body,
        content_type.as_deref(),
        base64_flagged,
    )?);
    builder.build()
}

/// Encodes one event into binary-mode headers and body.
///
/// A `Content-Type` header is written only when the event declares a
/// `datacontenttype`; an event without one stays without one on the
/// wire. Extension values are canonically stringified; non-string
/// values do not survive a binary round trip with their JSON type
/// intact.
pub fn encode(event: &Event) -> Result<(HeaderMap, Bytes), EnvelopeError> {
    let schema = event.spec_version().schema();
    let mut headers = HeaderMap::new();

    insert_header(
        &mut headers,
        &schema.version_header(),
        event.spec_version().as_str(),
    )?;

    for attr in schema.attributes() {
        let value = match attr.canonical {
            "id" => Some(event.id().to_owned()),
            "source" => Some(event.source().to_owned()),
            "type" => Some(event.event_type().to_owned()),
            "time" => event.time().map(|t| encode_timestamp(&t)),
            "subject" => event.subject().map(str::to_owned),
            "dataschema" => event.data_schema().map(str::to_owned),
            "datacontenttype" => None,
            other => event.extension(other).map(stringify),
        };
        if let Some(value) = value {
            insert_header(&mut headers, &attr.header(), &value)?;
        }
    }

    for (name, value) in event.extensions() {
        if schema
            .lookup_canonical(name)
            .is_some_and(|attr| attr.stored_as_extension)
        {
            continue;
        }
        insert_header(
            &mut headers,
            &format!("{ATTRIBUTE_PREFIX}{name}"),
            &stringify(value),
        )?;
    }

    if let Some(ct) = event.data_content_type() {
        insert_header(&mut headers, CONTENT_TYPE, ct)?;
    }

    let body = event.data().to_bytes()?;
    Ok((headers, body))
}

/// Reads the version string from the binary-mode version header,
/// falling back through version-specific aliases.
pub(crate) fn version_header_value(
    headers: &HeaderMap,
) -> Result<Option<String>, EnvelopeError> {
    let mut candidates = vec![format!("{ATTRIBUTE_PREFIX}specversion")];
    for version in SpecVersion::ALL {
        let header = version.schema().version_header();
        if !candidates.contains(&header) {
            candidates.push(header);
        }
    }
    for name in candidates {
        if let Some(raw) = headers.get(name.as_str()) {
            return Ok(Some(header_text(raw, "specversion")?.to_owned()));
        }
    }
    Ok(None)
}

fn interpret_body(
    body: &[u8],
    content_type: Option<&str>,
    base64_flagged: bool,
) -> Result<EventData, EnvelopeError> {
    if body.is_empty() {
        return Ok(EventData::None);
    }
    if base64_flagged {
        let decoded = BASE64.decode(body).map_err(|_| {
            MalformedEventError::InvalidAttribute {
                attribute: "data".into(),
                reason: "invalid base64 payload".into(),
            }
        })?;
        return Ok(EventData::Binary(decoded.into()));
    }
    match content_type {
        // No declared content type implies JSON data, as in
        // structured mode.
        None => Ok(EventData::Json(serde_json::from_slice(body)?)),
        Some(ct) if is_json_media(ct) => {
            Ok(EventData::Json(serde_json::from_slice(body)?))
        }
        Some(ct) if is_text_media(ct) => String::from_utf8(body.to_vec())
            .map(EventData::Text)
            .map_err(|_| {
                MalformedEventError::InvalidAttribute {
                    attribute: "data".into(),
                    reason: "text payload is not valid UTF-8".into(),
                }
                .into()
            }),
        _ => Ok(EventData::Binary(Bytes::copy_from_slice(body))),
    }
}

fn header_text<'a>(
    value: &'a HeaderValue,
    attribute: &str,
) -> Result<&'a str, EnvelopeError> {
    value.to_str().map_err(|_| {
        MalformedEventError::InvalidAttribute {
            attribute: attribute.into(),
            reason: "header value must be visible ASCII".into(),
        }
        .into()
    })
}

fn insert_header(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
) -> Result<(), EnvelopeError> {
    let name = HeaderName::try_from(name).map_err(|_| {
        MalformedEventError::InvalidAttribute {
            attribute: name.into(),
            reason: "not a valid HTTP header name".into(),
        }
    })?;
    let value = HeaderValue::try_from(value).map_err(|_| {
        MalformedEventError::InvalidAttribute {
            attribute: name.as_str().into(),
            reason: "not representable as an HTTP header value".into(),
        }
    })?;
    headers.insert(name, value);
    Ok(())
}

fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::try_from(*name).unwrap(),
                HeaderValue::try_from(*value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_decode_minimal_binary_request() -> Result<(), EnvelopeError> {
        let headers = headers(&[
            ("ce-id", "1"),
            ("ce-source", "s"),
            ("ce-type", "t"),
            ("ce-specversion", "1.0"),
            ("content-type", "text/plain"),
        ]);
        let event = decode(&headers, b"payload")?;
        assert_eq!(event.id(), "1");
        assert_eq!(event.data_content_type(), Some("text/plain"));
        assert_eq!(event.data().to_bytes()?.as_ref(), b"payload");
        Ok(())
    }

    #[test]
    fn test_decode_is_case_insensitive() -> Result<(), EnvelopeError> {
        // HeaderName normalizes to lowercase, as any HTTP layer does
        let headers = headers(&[
            ("CE-ID", "1"),
            ("Ce-Source", "s"),
            ("cE-tYpE", "t"),
            ("CE-SPECVERSION", "1.0"),
        ]);
        let event = decode(&headers, b"")?;
        assert_eq!(event.id(), "1");
        assert!(event.data().is_none());
        Ok(())
    }

    #[test]
    fn test_decode_json_body_and_extensions() -> Result<(), EnvelopeError> {
        let headers = headers(&[
            ("ce-id", "1"),
            ("ce-source", "s"),
            ("ce-type", "t"),
            ("ce-specversion", "1.0"),
            ("ce-traceparent", "00-abc"),
            ("content-type", "application/json; charset=utf-8"),
        ]);
        let event = decode(&headers, br#"{"k": 1}"#)?;
        assert_eq!(event.data().as_json().unwrap(), &json!({"k": 1}));
        assert_eq!(event.extension("traceparent").unwrap(), "00-abc");
        Ok(())
    }

    #[test]
    fn test_decode_unsupported_version() {
        let headers = headers(&[
            ("ce-id", "1"),
            ("ce-source", "s"),
            ("ce-type", "t"),
            ("ce-specversion", "9.9"),
        ]);
        let err = decode(&headers, b"").unwrap_err();
        assert!(matches!(err, EnvelopeError::SpecVersion(_)));
    }

    #[test]
    fn test_round_trip() -> Result<(), EnvelopeError> {
        let cases = [
            Event::builder()
                .spec_version(SpecVersion::V1_0)
                .id("1")
                .source("//example.com/app")
                .event_type("com.example.test")
                .time(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap())
                .subject("objects/42")
                .data_content_type("application/json")
                .data(json!({"k": [1, 2]}))
                .extension("traceparent", "00-abc")
                .build()?,
            Event::builder()
                .spec_version(SpecVersion::V1_0)
                .id("2")
                .source("s")
                .event_type("t")
                .data_content_type("application/octet-stream")
                .data(vec![0u8, 1, 2, 255])
                .build()?,
            Event::builder()
                .spec_version(SpecVersion::V0_1)
                .id("3")
                .source("s")
                .event_type("t")
                .data_content_type("text/plain")
                .data("hello")
                .build()?,
        ];
        for event in cases {
            let (headers, body) = encode(&event)?;
            let decoded = decode(&headers, &body)?;
            assert_eq!(decoded, event);
        }
        Ok(())
    }

    #[test]
    fn test_round_trip_without_declared_content_type(
    ) -> Result<(), EnvelopeError> {
        let event = Event::builder()
            .spec_version(SpecVersion::V1_0)
            .id("1")
            .source("s")
            .event_type("t")
            .data(json!({"k": 1}))
            .build()?;
        let (headers, body) = encode(&event)?;
        // No Content-Type header is invented on encode
        assert!(headers.get(CONTENT_TYPE).is_none());

        let decoded = decode(&headers, &body)?;
        assert_eq!(decoded.data_content_type(), None);
        assert_eq!(decoded, event);
        Ok(())
    }

    #[test]
    fn test_decode_base64_marker_header() -> Result<(), EnvelopeError> {
        let headers = headers(&[
            ("ce-id", "1"),
            ("ce-source", "s"),
            ("ce-type", "t"),
            ("ce-specversion", "0.3"),
            ("ce-datacontentencoding", "base64"),
            ("content-type", "application/octet-stream"),
        ]);
        let event = decode(&headers, b"AAEC")?;
        assert_eq!(
            event.data(),
            &EventData::Binary(Bytes::from_static(&[0, 1, 2]))
        );
        // The marker never leaks into extensions
        assert_eq!(event.extensions().count(), 0);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_unknown_encoding_marker() {
        let headers = headers(&[
            ("ce-id", "1"),
            ("ce-source", "s"),
            ("ce-type", "t"),
            ("ce-specversion", "0.3"),
            ("ce-datacontentencoding", "gzip"),
        ]);
        let err = decode(&headers, b"x").unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Malformed(
                MalformedEventError::InvalidAttribute { .. }
            )
        ));
    }

    #[test]
    fn test_encode_uses_aliased_headers_for_old_dialects(
    ) -> Result<(), EnvelopeError> {
        let event = Event::builder()
            .spec_version(SpecVersion::V0_1)
            .id("1")
            .source("s")
            .event_type("t")
            .build()?;
        let (headers, _) = encode(&event)?;
        assert_eq!(headers.get("ce-cloudeventsversion").unwrap(), "0.1");
        assert_eq!(headers.get("ce-eventid").unwrap(), "1");
        assert_eq!(headers.get("ce-eventtype").unwrap(), "t");
        assert!(headers.get("ce-id").is_none());
        Ok(())
    }
}
