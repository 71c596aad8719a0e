// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Single entry point over the content-mode codecs and the legacy
//! translator.
//!
//! [`resolve`] tries, in order: structured or batch decode when the
//! content type selects one, binary decode when the minimum attribute
//! headers are present, legacy translation when the body is JSON
//! without a version key. The `legacy_hint` flag moves the legacy rule
//! to the front, for routes known to receive legacy pushes. The first
//! applicable rule wins; when none applies the request fails with
//! [`UnrecognizedRequestError`].

use http::HeaderMap;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::binding::{self, DecodedRequest};
use crate::constants::limits::MAX_BODY_SIZE;
use crate::error::{
    EnvelopeError, MalformedEventError, UnrecognizedRequestError,
};
use crate::event::Event;
use crate::legacy::{self, TranslatedEvent};

/// What a request resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// One CloudEvent, from structured or binary mode.
    Event(Event),
    /// An ordered batch of CloudEvents.
    Batch(Vec<Event>),
    /// A translated legacy notification with its original pair.
    Legacy(TranslatedEvent),
}

/// Resolves a buffered request into event(s) or a legacy translation.
pub fn resolve(
    headers: &HeaderMap,
    body: &[u8],
    legacy_hint: bool,
) -> Result<Resolved, EnvelopeError> {
    if body.len() > MAX_BODY_SIZE {
        return Err(MalformedEventError::BodyTooLarge {
            size: body.len(),
            max: MAX_BODY_SIZE,
        }
        .into());
    }

    if legacy_hint {
        if let Some(resolved) = try_legacy(body)? {
            return Ok(resolved);
        }
    }

    if let Some(mode) = binding::detect(headers) {
        debug!(?mode, "resolving request by content mode");
        return Ok(match binding::decode(headers, body)? {
            DecodedRequest::One(event) => Resolved::Event(event),
            DecodedRequest::Batch(events) => Resolved::Batch(events),
        });
    }

    if !legacy_hint {
        if let Some(resolved) = try_legacy(body)? {
            return Ok(resolved);
        }
    }

    debug!("request matched no resolution rule");
    Err(UnrecognizedRequestError.into())
}

/// Attempts legacy translation. A body that is not JSON, or that does
/// not match a legacy shape, is not an error here; it just means the
/// rule does not apply. Unknown (service, type) pairs do fail, since
/// the body was recognized as legacy.
fn try_legacy(body: &[u8]) -> Result<Option<Resolved>, EnvelopeError> {
    let Ok(value) = serde_json::from_slice::<JsonValue>(body) else {
        return Ok(None);
    };
    match legacy::translate(&value) {
        Ok(translated) => {
            debug!(
                event_type = translated.event.event_type(),
                "translated legacy payload"
            );
            Ok(Some(Resolved::Legacy(translated)))
        }
        Err(EnvelopeError::Legacy(err)) => {
            warn!(
                service = %err.service,
                event_type = %err.event_type,
                "legacy payload with no mapping rule"
            );
            Err(err.into())
        }
        Err(_) => Ok(None),
    }
}
