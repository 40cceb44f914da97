// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The disk desired document and its change classifier.
//!
//! Almost nothing about a disk can change in place: the control plane
//! mutates name, description, tags, and the guest-visible connector, and
//! that is the whole list. Plan, size, sources, encryption, and placement
//! are all fixed at creation, so a change to any of them grades as
//! recreation. Moving a disk between servers is possible but cycles the
//! server's power, which grades as disruption.

pub mod convert;
pub mod driver;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use cumulus_api_types::{
    disk::{DiskConnection, DiskPlan, EncryptionAlgorithm},
    ResourceId,
};

use crate::classify::{ChangeRecord, Severity};
use crate::value::FieldValue;

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct DiskSpec {
    pub id: FieldValue<ResourceId>,
    pub name: String,
    pub description: FieldValue<String>,
    pub tags: BTreeSet<String>,
    pub plan: FieldValue<DiskPlan>,
    pub connection: FieldValue<DiskConnection>,
    pub size_gb: FieldValue<u32>,
    pub source_archive_id: FieldValue<ResourceId>,
    pub source_disk_id: FieldValue<ResourceId>,
    pub encryption_algorithm: FieldValue<EncryptionAlgorithm>,
    pub server_id: FieldValue<ResourceId>,
    /// Placement hint: keep this disk on different physical storage from
    /// these. Consumed at creation and never echoed back.
    pub distant_from: BTreeSet<ResourceId>,
}

/// A creation-fixed field counts as changed only when the new document
/// configures it explicitly to something else; leaving it absent never
/// forces a recreate of an object that already resolved it.
fn configured_change<T: PartialEq>(prior: &FieldValue<T>, new: &FieldValue<T>) -> bool {
    match new.as_value() {
        Some(v) => prior.as_value() != Some(v),
        None => false,
    }
}

pub fn classify(prior: Option<&DiskSpec>, new: &DiskSpec) -> ChangeRecord {
    let Some(prior) = prior else {
        return ChangeRecord::no_prior_state();
    };

    let mut record = ChangeRecord::new();
    record.compare("name", Severity::LiveUpdatable, &prior.name, &new.name);
    record.compare(
        "description",
        Severity::LiveUpdatable,
        &prior.description,
        &new.description,
    );
    record.compare("tags", Severity::LiveUpdatable, &prior.tags, &new.tags);

    if configured_change(&prior.connection, &new.connection) {
        record.push("connection", Severity::RequiresRecreation);
    }
    if configured_change(&prior.plan, &new.plan) {
        record.push("plan", Severity::RequiresRecreation);
    }
    if configured_change(&prior.size_gb, &new.size_gb) {
        record.push("size_gb", Severity::RequiresRecreation);
    }
    if configured_change(&prior.source_archive_id, &new.source_archive_id) {
        record.push("source_archive_id", Severity::RequiresRecreation);
    }
    if configured_change(&prior.source_disk_id, &new.source_disk_id) {
        record.push("source_disk_id", Severity::RequiresRecreation);
    }
    if configured_change(&prior.encryption_algorithm, &new.encryption_algorithm) {
        record.push("encryption_algorithm", Severity::RequiresRecreation);
    }
    if !new.distant_from.is_empty() && prior.distant_from != new.distant_from {
        record.push("distant_from", Severity::RequiresRecreation);
    }

    record.compare(
        "server_id",
        Severity::RequiresDisruption,
        &prior.server_id,
        &new.server_id,
    );

    record
}
