// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change records: what a classifier found when comparing a prior desired
//! document against a new one.
//!
//! The per-kind classification rules live with their document types; this
//! module defines the record they produce. Field-level equality is not the
//! whole story — each kind decides which sub-fields of a collection are
//! watched and which are cosmetic — but every classifier agrees on one rule:
//! with no prior state there is nothing to prove an in-place apply safe
//! against, so the record always demands disruption.

use std::fmt;

/// How intrusive applying a particular diff is.
///
/// Ordered by intrusiveness so a record's overall severity is the maximum of
/// its diffs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Apply while the object keeps running.
    LiveUpdatable,
    /// Requires stopping the object first.
    RequiresDisruption,
    /// Cannot be applied to the existing object at all; delete and recreate.
    RequiresRecreation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: &'static str,
    pub severity: Severity,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeRecord {
    diffs: Vec<FieldDiff>,
}

impl ChangeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record for a first convergence: no prior state, so the run is
    /// treated as disruptive unconditionally.
    pub fn no_prior_state() -> Self {
        let mut record = Self::new();
        record.push("prior_state", Severity::RequiresDisruption);
        record
    }

    pub fn push(&mut self, field: &'static str, severity: Severity) {
        self.diffs.push(FieldDiff { field, severity });
    }

    /// Pushes a diff only when the two values differ.
    pub fn compare<T: PartialEq>(
        &mut self,
        field: &'static str,
        severity: Severity,
        prior: &T,
        new: &T,
    ) {
        if prior != new {
            self.push(field, severity);
        }
    }

    pub fn diffs(&self) -> &[FieldDiff] {
        &self.diffs
    }

    /// The most intrusive severity in the record, or `None` when the
    /// documents already agree.
    pub fn severity(&self) -> Option<Severity> {
        self.diffs.iter().map(|d| d.severity).max()
    }

    pub fn is_converged(&self) -> bool {
        self.diffs.is_empty()
    }

    pub fn requires_disruption(&self) -> bool {
        self.severity() >= Some(Severity::RequiresDisruption)
    }

    pub fn requires_recreation(&self) -> bool {
        self.severity() == Some(Severity::RequiresRecreation)
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.diffs.is_empty() {
            return f.write_str("(converged)");
        }
        for (i, diff) in self.diffs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}({:?})", diff.field, diff.severity)?;
        }
        Ok(())
    }
}
