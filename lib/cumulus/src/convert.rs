// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared pieces of the expand/flatten translators.
//!
//! The per-kind translators live next to their document types (`server`,
//! `disk`, `vpn_router`, `app`); this module holds what they have in common.
//! Translators are pure: they never touch the network, so every error here is
//! a configuration error the caller must see before any remote call is made.

use std::collections::BTreeSet;

use thiserror::Error;

/// A configuration error detected while expanding a desired document into a
/// request payload. Surfaced verbatim; never retried.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("field `{0}` is required and has no server-side default")]
    MissingRequired(&'static str),

    #[error("fields `{0}` and `{1}` cannot both be set")]
    ConflictingFields(&'static str, &'static str),

    #[error(
        "version_index {index} is out of range: only {len} versions exist \
         (valid range is 0..{len})"
    )]
    VersionIndexOutOfRange { index: usize, len: usize },
}

/// Tags are an unordered set in the desired document but a list on the wire.
pub(crate) fn expand_tags(tags: &BTreeSet<String>) -> Vec<String> {
    tags.iter().cloned().collect()
}

pub(crate) fn flatten_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter().cloned().collect()
}
