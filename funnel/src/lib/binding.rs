// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Content mode detection and request-level decoding.
//!
//! An incoming HTTP request carries CloudEvents in one of three
//! content modes. Detection looks at `Content-Type` first, then at the
//! attribute headers:
//!
//! - `application/cloudevents+json` selects structured mode,
//! - `application/cloudevents-batch+json` selects batch mode,
//! - otherwise the presence of the minimum binary attribute headers
//!   (`ce-id`, `ce-source`, `ce-type`, `ce-specversion`, or the 0.1
//!   aliases) selects binary mode.
//!
//! Media type parameters such as `charset` never influence detection.

use http::HeaderMap;

use crate::codec::{binary, json, media_type_of};
use crate::constants::header::CONTENT_TYPE;
use crate::constants::limits::MAX_BODY_SIZE;
use crate::constants::media;
use crate::error::{
    AmbiguousEncodingError, EnvelopeError, MalformedEventError,
};
use crate::event::Event;

/// How a request carries its event(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    /// Whole event serialized as one JSON object in the body.
    Structured,
    /// JSON array of structured events in the body.
    Batch,
    /// Attributes in `ce-*` headers, payload as the raw body.
    Binary,
}

/// Outcome of decoding a request: a single event or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRequest {
    One(Event),
    Batch(Vec<Event>),
}

/// Determines the content mode of a request, if any applies.
pub fn detect(headers: &HeaderMap) -> Option<ContentMode> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(media_type_of);

    match content_type.as_deref() {
        Some(media::CLOUDEVENTS_JSON) => return Some(ContentMode::Structured),
        Some(media::CLOUDEVENTS_BATCH_JSON) => {
            return Some(ContentMode::Batch)
        }
        _ => {}
    }
    if has_binary_attributes(headers) {
        return Some(ContentMode::Binary);
    }
    None
}

/// Decodes a request according to its detected content mode.
///
/// Oversized bodies are rejected before any parsing. A request that
/// matches no content mode fails with [`AmbiguousEncodingError`].
pub fn decode(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<DecodedRequest, EnvelopeError> {
    if body.len() > MAX_BODY_SIZE {
        return Err(MalformedEventError::BodyTooLarge {
            size: body.len(),
            max: MAX_BODY_SIZE,
        }
        .into());
    }
    let mode = detect(headers).ok_or_else(|| AmbiguousEncodingError {
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    })?;
    match mode {
        ContentMode::Structured => {
            json::decode(body).map(DecodedRequest::One)
        }
        ContentMode::Batch => {
            json::decode_batch(body).map(DecodedRequest::Batch)
        }
        ContentMode::Binary => {
            binary::decode(headers, body).map(DecodedRequest::One)
        }
    }
}

/// True when the headers carry the minimum binary-mode attribute set
/// of some supported dialect: a version header plus id, source and
/// type under their dialect wire names.
fn has_binary_attributes(headers: &HeaderMap) -> bool {
    let Ok(Some(version)) = binary::version_header_value(headers) else {
        return false;
    };
    let Ok(version) = crate::spec::SpecVersion::parse(&version) else {
        // Unknown version string still signals binary intent; let the
        // codec produce the precise error.
        return true;
    };
    let schema = version.schema();
    ["id", "source", "type"].iter().all(|canonical| {
        schema
            .lookup_canonical(canonical)
            .map(|attr| attr.header())
            .is_some_and(|h| headers.contains_key(h.as_str()))
    })
}
