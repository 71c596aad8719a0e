// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The legacy mapping table.
//!
//! One entry per legacy event type from the managed-source
//! compatibility list. The table is plain data, versioned with the
//! crate; lookups for unlisted types fail explicitly instead of
//! falling back to a guessed rule.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Originating service hostnames used in mapping rules and `source`
/// URIs.
pub mod service {
    pub const PUBSUB: &str = "pubsub.googleapis.com";
    pub const STORAGE: &str = "storage.googleapis.com";
    pub const FIRESTORE: &str = "firestore.googleapis.com";
    pub const FIREBASE_AUTH: &str = "firebaseauth.googleapis.com";
    pub const FIREBASE_DB: &str = "firebasedatabase.googleapis.com";
}

/// How a rule reshapes the legacy `data` payload into CloudEvents
/// data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reshape {
    /// Payload carried over unchanged.
    Passthrough,
    /// Payload nested under a `message` key, with the legacy event id
    /// and timestamp added as `messageId` / `publishTime`.
    WrapMessage,
    /// Auth user record with its `metadata` field names migrated.
    FirebaseAuth,
}

/// One translation rule: the service a legacy type belongs to, the
/// CloudEvents type it becomes, and the payload reshape to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingRule {
    pub service: &'static str,
    pub ce_type: &'static str,
    pub reshape: Reshape,
}

impl MappingRule {
    const fn new(
        service: &'static str,
        ce_type: &'static str,
        reshape: Reshape,
    ) -> Self {
        Self {
            service,
            ce_type,
            reshape,
        }
    }
}

static RULES: Lazy<HashMap<&'static str, MappingRule>> = Lazy::new(|| {
    use Reshape::*;

    let pubsub_publish = MappingRule::new(
        service::PUBSUB,
        "google.cloud.pubsub.topic.v1.messagePublished",
        WrapMessage,
    );
    HashMap::from([
        ("google.pubsub.topic.publish", pubsub_publish),
        (
            "providers/cloud.pubsub/eventTypes/topic.publish",
            pubsub_publish,
        ),
        (
            "google.storage.object.finalize",
            MappingRule::new(
                service::STORAGE,
                "google.cloud.storage.object.v1.finalized",
                Passthrough,
            ),
        ),
        (
            "google.storage.object.delete",
            MappingRule::new(
                service::STORAGE,
                "google.cloud.storage.object.v1.deleted",
                Passthrough,
            ),
        ),
        (
            "google.storage.object.archive",
            MappingRule::new(
                service::STORAGE,
                "google.cloud.storage.object.v1.archived",
                Passthrough,
            ),
        ),
        (
            "google.storage.object.metadataUpdate",
            MappingRule::new(
                service::STORAGE,
                "google.cloud.storage.object.v1.metadataUpdated",
                Passthrough,
            ),
        ),
        (
            "providers/cloud.firestore/eventTypes/document.write",
            MappingRule::new(
                service::FIRESTORE,
                "google.cloud.firestore.document.v1.written",
                Passthrough,
            ),
        ),
        (
            "providers/cloud.firestore/eventTypes/document.create",
            MappingRule::new(
                service::FIRESTORE,
                "google.cloud.firestore.document.v1.created",
                Passthrough,
            ),
        ),
        (
            "providers/cloud.firestore/eventTypes/document.update",
            MappingRule::new(
                service::FIRESTORE,
                "google.cloud.firestore.document.v1.updated",
                Passthrough,
            ),
        ),
        (
            "providers/cloud.firestore/eventTypes/document.delete",
            MappingRule::new(
                service::FIRESTORE,
                "google.cloud.firestore.document.v1.deleted",
                Passthrough,
            ),
        ),
        (
            "providers/firebase.auth/eventTypes/user.create",
            MappingRule::new(
                service::FIREBASE_AUTH,
                "google.firebase.auth.user.v1.created",
                FirebaseAuth,
            ),
        ),
        (
            "providers/firebase.auth/eventTypes/user.delete",
            MappingRule::new(
                service::FIREBASE_AUTH,
                "google.firebase.auth.user.v1.deleted",
                FirebaseAuth,
            ),
        ),
        (
            "providers/google.firebase.database/eventTypes/ref.create",
            MappingRule::new(
                service::FIREBASE_DB,
                "google.firebase.database.ref.v1.created",
                Passthrough,
            ),
        ),
        (
            "providers/google.firebase.database/eventTypes/ref.write",
            MappingRule::new(
                service::FIREBASE_DB,
                "google.firebase.database.ref.v1.written",
                Passthrough,
            ),
        ),
        (
            "providers/google.firebase.database/eventTypes/ref.update",
            MappingRule::new(
                service::FIREBASE_DB,
                "google.firebase.database.ref.v1.updated",
                Passthrough,
            ),
        ),
        (
            "providers/google.firebase.database/eventTypes/ref.delete",
            MappingRule::new(
                service::FIREBASE_DB,
                "google.firebase.database.ref.v1.deleted",
                Passthrough,
            ),
        ),
    ])
});

/// Looks up the rule for a legacy event type.
pub fn lookup(event_type: &str) -> Option<&'static MappingRule> {
    RULES.get(event_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_pubsub_spellings_share_a_rule() {
        let new = lookup("google.pubsub.topic.publish").unwrap();
        let old =
            lookup("providers/cloud.pubsub/eventTypes/topic.publish")
                .unwrap();
        assert_eq!(new, old);
        assert_eq!(new.reshape, Reshape::WrapMessage);
    }

    #[test]
    fn test_storage_rules() {
        let rule = lookup("google.storage.object.finalize").unwrap();
        assert_eq!(rule.service, service::STORAGE);
        assert_eq!(rule.ce_type, "google.cloud.storage.object.v1.finalized");
        assert!(lookup("google.storage.object.metadataUpdate").is_some());
    }

    #[test]
    fn test_unknown_type() {
        assert!(lookup("google.example.something.unknown").is_none());
    }
}
