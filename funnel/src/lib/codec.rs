// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Content-mode codecs.
//!
//! - [`json`] - structured and batch content modes (attributes and
//!   payload in one JSON document)
//! - [`binary`] - binary content mode (attributes in `ce-*` headers,
//!   payload as the raw body)

pub mod binary;
pub mod json;

use crate::constants::media;

/// Extracts the bare media type of a Content-Type value: parameters
/// (charset and friends) stripped, whitespace trimmed, lowercased.
pub(crate) fn media_type_of(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a content type denotes JSON (`application/json` or any
/// `*+json` structured syntax).
pub(crate) fn is_json_media(content_type: &str) -> bool {
    let media = media_type_of(content_type);
    media == media::JSON || media.ends_with("+json")
}

/// Whether a content type denotes text (`text/*`).
pub(crate) fn is_text_media(content_type: &str) -> bool {
    media_type_of(content_type).starts_with("text/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_extraction() {
        assert_eq!(media_type_of("application/JSON; charset=utf-8"), "application/json");
        assert_eq!(media_type_of(" text/plain "), "text/plain");
        assert_eq!(media_type_of(""), "");
    }

    #[test]
    fn test_media_classification() {
        assert!(is_json_media("application/json"));
        assert!(is_json_media("application/cloudevents+json; charset=utf-8"));
        assert!(!is_json_media("text/json-ish"));

        assert!(is_text_media("text/plain; charset=utf-8"));
        assert!(!is_text_media("application/xml"));
    }
}
