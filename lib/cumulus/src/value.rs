// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Four-state field values for desired-configuration documents.
//!
//! A field in a desired document is in exactly one of four states, and the
//! distinction between them is what keeps repeated plan/apply cycles quiet:
//!
//! - [`FieldValue::Value`]: the operator supplied this value.
//! - [`FieldValue::Null`]: the operator explicitly asked for "no value".
//! - [`FieldValue::Unknown`]: the value will be computed by the control plane
//!   and filled in when canonical state is read back.
//! - [`FieldValue::Default`]: the operator said nothing; the control plane's
//!   default applies.
//!
//! Collapsing `Unknown` into `Null` (or vice versa) makes every subsequent
//! plan report a spurious diff, so nothing in this module converts between
//! the two implicitly.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "value")]
pub enum FieldValue<T> {
    Value(T),
    Null,
    Unknown,
    Default,
}

impl<T> Default for FieldValue<T> {
    fn default() -> Self {
        FieldValue::Default
    }
}

impl<T> FieldValue<T> {
    pub fn is_value(&self) -> bool {
        matches!(self, FieldValue::Value(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, FieldValue::Unknown)
    }

    pub fn is_default(&self) -> bool {
        matches!(self, FieldValue::Default)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The value to place in a request payload: a supplied value is sent,
    /// anything else is omitted so the control plane applies its own default.
    pub fn request_value(&self) -> Option<T>
    where
        T: Clone,
    {
        self.as_value().cloned()
    }

    /// Resolves the field against a known server-side default at expand time.
    pub fn value_or(&self, default: T) -> T
    where
        T: Clone,
    {
        match self {
            FieldValue::Value(v) => v.clone(),
            _ => default,
        }
    }

    /// Carries a write-only value forward from prior state: the control plane
    /// never echoes these, so a flattened document keeps whatever the prior
    /// document carried unless this one already has its own value.
    pub fn or_carry_from(self, prior: &FieldValue<T>) -> FieldValue<T>
    where
        T: Clone,
    {
        match self {
            FieldValue::Value(v) => FieldValue::Value(v),
            other => match prior {
                FieldValue::Value(v) => FieldValue::Value(v.clone()),
                _ => other,
            },
        }
    }
}

impl<T> From<Option<T>> for FieldValue<T> {
    /// Maps a canonical-state optional onto a field value: present becomes a
    /// value, absent becomes an explicit null. Canonical state is always
    /// fully known, so `Unknown`/`Default` never appear on this path.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldValue::Value(v),
            None => FieldValue::Null,
        }
    }
}
