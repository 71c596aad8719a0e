// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Legacy payload shapes and the translation itself.

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use super::table::{self, MappingRule, Reshape};
use crate::codec::json::parse_timestamp;
use crate::constants::media;
use crate::error::{
    EnvelopeError, UnknownLegacyEventError, UnrecognizedRequestError,
};
use crate::event::Event;
use crate::spec::SpecVersion;

/// The resource a legacy notification refers to. Older payloads carry
/// a bare name string, newer ones a full descriptor object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyResource {
    Full {
        service: Option<String>,
        name: String,
        #[serde(rename = "type")]
        kind: Option<String>,
    },
    Name(String),
}

impl LegacyResource {
    pub fn name(&self) -> &str {
        match self {
            Self::Full { name, .. } => name,
            Self::Name(name) => name,
        }
    }

    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Full { service, .. } => service.as_deref(),
            Self::Name(_) => None,
        }
    }
}

/// The `context` half of the legacy two-argument interface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyContext {
    pub event_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub event_type: String,
    pub resource: LegacyResource,
}

/// Recognized wire shapes of a legacy body, tried in order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyShape {
    WithContext {
        context: LegacyContext,
        data: JsonValue,
    },
    Flat {
        #[serde(flatten)]
        context: LegacyContext,
        data: JsonValue,
    },
}

impl LegacyShape {
    fn into_parts(self) -> (LegacyContext, JsonValue) {
        match self {
            Self::WithContext { context, data }
            | Self::Flat { context, data } => (context, data),
        }
    }
}

/// A translated legacy notification: the canonical event plus the
/// original `(data, context)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedEvent {
    pub event: Event,
    pub data: JsonValue,
    pub context: LegacyContext,
}

/// Translates a parsed legacy body into a canonical 1.0 event.
///
/// Bodies that carry a CloudEvents version key, or that match neither
/// recognized legacy shape, fail with [`UnrecognizedRequestError`]. A
/// well-shaped body whose event type has no table entry fails with
/// [`UnknownLegacyEventError`] naming the pair; no rule is ever
/// guessed.
pub fn translate(
    body: &JsonValue,
) -> Result<TranslatedEvent, EnvelopeError> {
    let Some(map) = body.as_object() else {
        return Err(UnrecognizedRequestError.into());
    };
    if map.contains_key("specversion")
        || map.contains_key("cloudEventsVersion")
    {
        return Err(UnrecognizedRequestError.into());
    }

    let shape: LegacyShape = serde_json::from_value(body.clone())
        .map_err(|_| UnrecognizedRequestError)?;
    let (context, data) = shape.into_parts();

    let rule = table::lookup(&context.event_type).ok_or_else(|| {
        UnknownLegacyEventError {
            service: context
                .resource
                .service()
                .unwrap_or("unknown")
                .to_owned(),
            event_type: context.event_type.clone(),
        }
    })?;

    let (resource_path, subject) = split_resource(rule, &context, &data);

    let mut builder = Event::builder()
        .spec_version(SpecVersion::V1_0)
        .id(&context.event_id)
        .source(format!("//{}/{resource_path}", rule.service))
        .event_type(rule.ce_type)
        .data_content_type(media::JSON)
        .data(reshape(rule.reshape, &context, &data));
    if let Some(raw) = &context.timestamp {
        builder = builder.time(parse_timestamp(raw)?);
    }
    if let Some(subject) = subject {
        builder = builder.subject(subject);
    }

    Ok(TranslatedEvent {
        event: builder.build()?,
        data,
        context,
    })
}

/// Splits the resource name into the `source` path and an optional
/// `subject`, per service convention.
fn split_resource(
    rule: &MappingRule,
    context: &LegacyContext,
    data: &JsonValue,
) -> (String, Option<String>) {
    let name = context.resource.name();
    if rule.service == table::service::STORAGE {
        if let Some((bucket, object)) = name.split_once("/objects/") {
            return (bucket.to_owned(), Some(format!("objects/{object}")));
        }
    }
    if rule.reshape == Reshape::FirebaseAuth {
        let subject = data
            .get("uid")
            .and_then(JsonValue::as_str)
            .map(|uid| format!("users/{uid}"));
        return (name.to_owned(), subject);
    }
    (name.to_owned(), None)
}

fn reshape(
    kind: Reshape,
    context: &LegacyContext,
    data: &JsonValue,
) -> JsonValue {
    match kind {
        Reshape::Passthrough => data.clone(),
        Reshape::WrapMessage => {
            let mut message = data.as_object().cloned().unwrap_or_default();
            message
                .insert("messageId".into(), json!(context.event_id));
            if let Some(ts) = &context.timestamp {
                message.insert("publishTime".into(), json!(ts));
            }
            json!({ "message": message })
        }
        Reshape::FirebaseAuth => {
            let mut payload = data.clone();
            if let Some(meta) = payload
                .get_mut("metadata")
                .and_then(JsonValue::as_object_mut)
            {
                for (old, new) in [
                    ("createdAt", "createTime"),
                    ("lastSignedInAt", "lastSignInTime"),
                ] {
                    if let Some(value) = meta.remove(old) {
                        meta.insert(new.into(), value);
                    }
                }
            }
            payload
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_translate_storage_with_context() -> Result<(), EnvelopeError> {
        let body = json!({
            "context": {
                "eventId": "1147091835525187",
                "timestamp": "2020-04-23T07:38:57.772Z",
                "eventType": "google.storage.object.finalize",
                "resource": {
                    "service": "storage.googleapis.com",
                    "name": "projects/_/buckets/some-bucket/objects/folder/Test.cs",
                    "type": "storage#object",
                },
            },
            "data": { "bucket": "some-bucket", "name": "folder/Test.cs" },
        });
        let translated = translate(&body)?;
        let event = &translated.event;
        assert_eq!(
            event.event_type(),
            "google.cloud.storage.object.v1.finalized"
        );
        assert_eq!(
            event.source(),
            "//storage.googleapis.com/projects/_/buckets/some-bucket"
        );
        assert_eq!(event.subject(), Some("objects/folder/Test.cs"));
        assert_eq!(event.id(), "1147091835525187");
        assert_eq!(event.data_content_type(), Some("application/json"));
        assert_eq!(
            event.data().as_json().unwrap(),
            &json!({ "bucket": "some-bucket", "name": "folder/Test.cs" })
        );
        // The original pair survives untouched
        assert_eq!(translated.context.event_id, "1147091835525187");
        assert_eq!(translated.data["bucket"], "some-bucket");
        Ok(())
    }

    #[test]
    fn test_translate_flat_pubsub() -> Result<(), EnvelopeError> {
        let body = json!({
            "eventId": "1215011316659232",
            "timestamp": "2020-05-18T12:13:19Z",
            "eventType": "google.pubsub.topic.publish",
            "resource": {
                "service": "pubsub.googleapis.com",
                "name": "projects/sample-project/topics/gcf-test",
                "type": "type.googleapis.com/google.pubsub.v1.PubsubMessage",
            },
            "data": {
                "data": "MTA=",
                "attributes": { "attr": "value" },
            },
        });
        let translated = translate(&body)?;
        let event = &translated.event;
        assert_eq!(
            event.event_type(),
            "google.cloud.pubsub.topic.v1.messagePublished"
        );
        assert_eq!(
            event.source(),
            "//pubsub.googleapis.com/projects/sample-project/topics/gcf-test"
        );
        let payload = event.data().as_json().unwrap();
        assert_eq!(payload["message"]["data"], "MTA=");
        assert_eq!(payload["message"]["messageId"], "1215011316659232");
        assert_eq!(
            payload["message"]["publishTime"],
            "2020-05-18T12:13:19Z"
        );
        // Two-argument data stays un-wrapped
        assert_eq!(translated.data["data"], "MTA=");
        Ok(())
    }

    #[test]
    fn test_translate_firebase_auth() -> Result<(), EnvelopeError> {
        let body = json!({
            "eventId": "aaaaaa-1111-bbbb-2222-cccccccccccc",
            "timestamp": "2020-09-29T11:32:00.123Z",
            "eventType": "providers/firebase.auth/eventTypes/user.create",
            "resource": "projects/my-project-id",
            "data": {
                "uid": "UUpby3s4spZre6kHsgVSPetzQ8l2",
                "email": "test@nowhere.com",
                "metadata": {
                    "createdAt": "2020-05-26T10:42:27Z",
                    "lastSignedInAt": "2020-10-24T11:00:00Z",
                },
            },
        });
        let translated = translate(&body)?;
        let event = &translated.event;
        assert_eq!(
            event.event_type(),
            "google.firebase.auth.user.v1.created"
        );
        assert_eq!(
            event.source(),
            "//firebaseauth.googleapis.com/projects/my-project-id"
        );
        assert_eq!(
            event.subject(),
            Some("users/UUpby3s4spZre6kHsgVSPetzQ8l2")
        );
        let meta = &event.data().as_json().unwrap()["metadata"];
        assert_eq!(meta["createTime"], "2020-05-26T10:42:27Z");
        assert_eq!(meta["lastSignInTime"], "2020-10-24T11:00:00Z");
        assert!(meta.get("createdAt").is_none());
        Ok(())
    }

    #[test]
    fn test_rejects_cloudevents_body() {
        let body = json!({"specversion": "1.0", "id": "1"});
        let err = translate(&body).unwrap_err();
        assert!(matches!(err, EnvelopeError::Unrecognized(_)));

        let body = json!({"cloudEventsVersion": "0.1", "eventID": "1"});
        let err = translate(&body).unwrap_err();
        assert!(matches!(err, EnvelopeError::Unrecognized(_)));
    }

    #[test]
    fn test_unknown_pair_is_named() {
        let body = json!({
            "eventId": "1",
            "eventType": "google.example.something.unknown",
            "resource": {
                "service": "example.googleapis.com",
                "name": "projects/p/things/t",
            },
            "data": {},
        });
        match translate(&body).unwrap_err() {
            EnvelopeError::Legacy(e) => {
                assert_eq!(e.service, "example.googleapis.com");
                assert_eq!(e.event_type, "google.example.something.unknown");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_shape_is_unrecognized() {
        let err = translate(&json!({"data": 1})).unwrap_err();
        assert!(matches!(err, EnvelopeError::Unrecognized(_)));
        let err = translate(&json!("just a string")).unwrap_err();
        assert!(matches!(err, EnvelopeError::Unrecognized(_)));
    }
}
