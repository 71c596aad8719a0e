// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! End-to-end resolution over the public surface: content-mode
//! detection, every supported dialect, and legacy translation.

use chrono::{TimeZone, Utc};
use funnel::codec::{binary, json};
use funnel::{
    resolve, EnvelopeError, Event, EventData, Resolved, SpecVersion,
};
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
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
fn structured_round_trip_every_dialect() -> Result<(), EnvelopeError> {
    for version in SpecVersion::ALL {
        let mut builder = Event::builder()
            .spec_version(version)
            .id("42")
            .source("//example.com/app")
            .event_type("com.example.ping")
            .time(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap())
            .data_content_type("application/json")
            .data(json!({"n": 7}))
            .extension("traceparent", "00-abc");
        if version.schema().lookup_canonical("subject").is_some() {
            builder = builder.subject("things/42");
        }
        let event = builder.build()?;

        let body = json::encode_bytes(&event)?;
        let map =
            headers(&[("content-type", "application/cloudevents+json")]);
        match resolve(&map, &body, false)? {
            Resolved::Event(decoded) => assert_eq!(decoded, event),
            other => panic!("unexpected resolution: {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn binary_round_trip_through_resolve() -> Result<(), EnvelopeError> {
    let event = Event::builder()
        .spec_version(SpecVersion::V1_0)
        .id("42")
        .source("//example.com/app")
        .event_type("com.example.blob")
        .data_content_type("application/octet-stream")
        .data(vec![0u8, 159, 146, 150])
        .build()?;
    let (map, body) = binary::encode(&event)?;
    match resolve(&map, &body, false)? {
        Resolved::Event(decoded) => assert_eq!(decoded, event),
        other => panic!("unexpected resolution: {other:?}"),
    }
    Ok(())
}

// The two concrete resolution cases the wire format guarantees.

#[test]
fn resolves_structured_curl_example() -> Result<(), EnvelopeError> {
    let map = headers(&[(
        "content-type",
        "application/cloudevents+json; charset=utf-8",
    )]);
    let body = br#"{"specversion":"1.0","id":"123","source":"curl","type":"com.example.test","data":"hi"}"#;
    let Resolved::Event(event) = resolve(&map, body, false)? else {
        panic!("expected a single event");
    };
    assert_eq!(event.id(), "123");
    assert_eq!(event.event_type(), "com.example.test");
    assert_eq!(event.data().as_json().unwrap(), &json!("hi"));
    Ok(())
}

#[test]
fn resolves_binary_text_example() -> Result<(), EnvelopeError> {
    let map = headers(&[
        ("ce-id", "1"),
        ("ce-source", "s"),
        ("ce-type", "t"),
        ("ce-specversion", "1.0"),
        ("content-type", "text/plain"),
    ]);
    let Resolved::Event(event) = resolve(&map, b"payload", false)? else {
        panic!("expected a single event");
    };
    assert_eq!(event.data_content_type(), Some("text/plain"));
    assert_eq!(event.data(), &EventData::Text("payload".into()));
    assert_eq!(event.data().to_bytes()?.as_ref(), b"payload");
    Ok(())
}

#[test]
fn batch_preserves_order_and_count() -> Result<(), EnvelopeError> {
    let events: Vec<Event> = (0..5)
        .map(|i| {
            Event::builder()
                .spec_version(SpecVersion::V1_0)
                .id(i.to_string())
                .source("s")
                .event_type("t")
                .build()
        })
        .collect::<Result<_, _>>()?;
    let body = json::encode_batch_bytes(&events)?;
    let map =
        headers(&[("content-type", "application/cloudevents-batch+json")]);
    let Resolved::Batch(decoded) = resolve(&map, &body, false)? else {
        panic!("expected a batch");
    };
    assert_eq!(decoded, events);

    let Resolved::Batch(empty) = resolve(&map, b"[]", false)? else {
        panic!("expected a batch");
    };
    assert!(empty.is_empty());
    Ok(())
}

#[test]
fn legacy_pubsub_push_end_to_end() -> Result<(), EnvelopeError> {
    let body = serde_json::to_vec(&json!({
        "context": {
            "eventId": "1215011316659232",
            "timestamp": "2020-05-18T12:13:19Z",
            "eventType": "google.pubsub.topic.publish",
            "resource": {
                "service": "pubsub.googleapis.com",
                "name": "projects/sample-project/topics/gcf-test",
            },
        },
        "data": { "data": "MTA=" },
    }))
    .unwrap();
    let map = headers(&[("content-type", "application/json")]);
    let Resolved::Legacy(translated) = resolve(&map, &body, false)? else {
        panic!("expected a legacy translation");
    };
    let event = &translated.event;
    assert_eq!(event.spec_version(), SpecVersion::V1_0);
    assert_eq!(
        event.event_type(),
        "google.cloud.pubsub.topic.v1.messagePublished"
    );
    assert_eq!(
        event.source(),
        "//pubsub.googleapis.com/projects/sample-project/topics/gcf-test"
    );
    let message = &event.data().as_json().unwrap()["message"];
    assert_eq!(message["data"], "MTA=");
    assert_eq!(message["messageId"], "1215011316659232");

    // The translated event itself survives a structured round trip
    let re_encoded = json::encode_bytes(event)?;
    assert_eq!(json::decode(&re_encoded)?, *event);
    Ok(())
}

#[test]
fn unknown_request_shape_fails() {
    let map = headers(&[("content-type", "text/html")]);
    let err = resolve(&map, b"<p>hello</p>", false).unwrap_err();
    assert!(matches!(err, EnvelopeError::Unrecognized(_)));
}
