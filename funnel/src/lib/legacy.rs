// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Translation of pre-CloudEvents notification payloads.
//!
//! Older managed event sources delivered a bare JSON body with a
//! `(data, context)` split instead of a CloudEvents envelope. The
//! [`table`] module holds the versioned mapping from each legacy event
//! type to its CloudEvents equivalent; [`translate`] applies a rule to
//! a parsed body and yields both a canonical [`Event`](crate::Event)
//! and the original two-argument pair for callers that still expect
//! it.

pub mod table;
pub mod translate;

pub use table::{lookup, MappingRule, Reshape};
pub use translate::{
    translate, LegacyContext, LegacyResource, TranslatedEvent,
};
