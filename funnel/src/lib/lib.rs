// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! CloudEvents codec and legacy-event translator.
//!
//! This crate turns buffered HTTP requests into canonical
//! [`Event`] values and back, across four CloudEvents dialects
//! (0.1, 0.2, 0.3, 1.0) and three content modes (binary, structured,
//! batch), and translates pre-CloudEvents notification payloads from
//! managed sources into 1.0 events via a versioned mapping table.
//!
//! The core is purely functional over its inputs: no I/O, no shared
//! mutable state. Callers hand in already-read headers and body bytes;
//! [`dispatch::resolve`] picks the applicable decoding rule and
//! returns an event, a batch, or a translated legacy pair.
//!
//! ```
//! use funnel::{Event, SpecVersion};
//!
//! let event = Event::builder()
//!     .spec_version(SpecVersion::V1_0)
//!     .id("42")
//!     .source("//example.com/app")
//!     .event_type("com.example.ping")
//!     .data(serde_json::json!({"ok": true}))
//!     .build()?;
//! let wire = funnel::codec::json::encode_bytes(&event)?;
//! assert_eq!(funnel::codec::json::decode(&wire)?, event);
//! # Ok::<(), funnel::EnvelopeError>(())
//! ```

pub mod binding;
pub mod codec;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod legacy;
pub mod spec;

pub use binding::{ContentMode, DecodedRequest};
pub use dispatch::{resolve, Resolved};
pub use error::{
    AmbiguousEncodingError, EnvelopeError, InvalidJsonError,
    MalformedEventError, UnknownLegacyEventError, UnrecognizedRequestError,
    UnsupportedSpecVersionError,
};
pub use event::{Event, EventBuilder, EventData};
pub use legacy::{LegacyContext, LegacyResource, TranslatedEvent};
pub use spec::SpecVersion;
