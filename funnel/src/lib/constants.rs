// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Wire-format constants shared by the codecs and the binding resolver.

/// Media types used for content-mode detection and payload typing.
pub mod media {
    /// Structured content mode (one event per body).
    pub const CLOUDEVENTS_JSON: &str = "application/cloudevents+json";

    /// Batch content mode (JSON array of structured events).
    pub const CLOUDEVENTS_BATCH_JSON: &str =
        "application/cloudevents-batch+json";

    /// Plain JSON payloads.
    pub const JSON: &str = "application/json";
}

/// Header names and prefixes for the binary content mode.
pub mod header {
    /// Prefix for per-attribute headers (`ce-id`, `ce-source`, ...).
    ///
    /// Matching is case-insensitive on the wire.
    pub const ATTRIBUTE_PREFIX: &str = "ce-";

    /// Standard Content-Type header name.
    pub const CONTENT_TYPE: &str = "content-type";
}

/// Request size limits enforced before any decoding takes place.
pub mod limits {
    /// Maximum accepted request body size (10MB).
    pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;
}
