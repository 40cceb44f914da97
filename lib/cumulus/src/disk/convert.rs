// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Expand/flatten translation for disks.

use cumulus_api_types::disk::{ApiDisk, DiskCreateRequest, DiskUpdateRequest};

use crate::convert::{expand_tags, flatten_tags, ExpandError};
use crate::value::FieldValue;

use super::DiskSpec;

const DEFAULT_SIZE_GB: u32 = 20;

pub fn expand_create(spec: &DiskSpec) -> Result<DiskCreateRequest, ExpandError> {
    if spec.name.is_empty() {
        return Err(ExpandError::MissingRequired("name"));
    }
    if spec.source_archive_id.is_value() && spec.source_disk_id.is_value() {
        return Err(ExpandError::ConflictingFields(
            "source_archive_id",
            "source_disk_id",
        ));
    }
    Ok(DiskCreateRequest {
        name: spec.name.clone(),
        description: spec.description.value_or(String::new()),
        tags: expand_tags(&spec.tags),
        plan: spec.plan.value_or(Default::default()),
        connection: spec.connection.value_or(Default::default()),
        size_mb: u64::from(spec.size_gb.value_or(DEFAULT_SIZE_GB)) * 1024,
        source_archive_id: spec.source_archive_id.request_value(),
        source_disk_id: spec.source_disk_id.request_value(),
        encryption_algorithm: spec.encryption_algorithm.value_or(Default::default()),
        server_id: spec.server_id.request_value(),
        distant_from: spec.distant_from.iter().cloned().collect(),
    })
}

pub fn expand_update(spec: &DiskSpec) -> Result<DiskUpdateRequest, ExpandError> {
    if spec.name.is_empty() {
        return Err(ExpandError::MissingRequired("name"));
    }
    Ok(DiskUpdateRequest {
        name: spec.name.clone(),
        description: spec.description.value_or(String::new()),
        tags: expand_tags(&spec.tags),
        connection: spec.connection.value_or(Default::default()),
    })
}

/// Rebuilds the desired document from canonical state. The placement hint
/// (`distant_from`) is consumed at creation and never echoed, so it is
/// carried over from the prior document; zeroing it would make every
/// subsequent plan disagree with itself.
pub fn flatten(api: &ApiDisk, prior: Option<&DiskSpec>) -> DiskSpec {
    DiskSpec {
        id: FieldValue::Value(api.id.clone()),
        name: api.name.clone(),
        description: FieldValue::Value(api.description.clone()),
        tags: flatten_tags(&api.tags),
        plan: FieldValue::Value(api.plan),
        connection: FieldValue::Value(api.connection),
        size_gb: FieldValue::Value(api.size_gb() as u32),
        source_archive_id: api.source_archive_id.clone().into(),
        source_disk_id: api.source_disk_id.clone().into(),
        encryption_algorithm: FieldValue::Value(api.encryption_algorithm),
        server_id: api.server_id.clone().into(),
        distant_from: prior.map(|p| p.distant_from.clone()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cumulus_api_types::disk::DiskPlan;
    use cumulus_api_types::{Availability, ResourceId};

    fn apply_create(req: &DiskCreateRequest) -> ApiDisk {
        ApiDisk {
            id: ResourceId::new("disk-100"),
            name: req.name.clone(),
            description: req.description.clone(),
            tags: req.tags.clone(),
            plan: req.plan,
            connection: req.connection,
            size_mb: req.size_mb,
            source_archive_id: req.source_archive_id.clone(),
            source_disk_id: req.source_disk_id.clone(),
            encryption_algorithm: req.encryption_algorithm,
            server_id: req.server_id.clone(),
            availability: Availability::Available,
        }
    }

    #[test]
    fn conflicting_sources_fail_expand() {
        let spec = DiskSpec {
            name: "data-01".into(),
            source_archive_id: FieldValue::Value(ResourceId::new("arc-1")),
            source_disk_id: FieldValue::Value(ResourceId::new("disk-9")),
            ..Default::default()
        };
        assert!(matches!(
            expand_create(&spec),
            Err(ExpandError::ConflictingFields("source_archive_id", "source_disk_id"))
        ));
    }

    #[test]
    fn absent_size_and_plan_expand_to_defaults() {
        let spec = DiskSpec { name: "data-01".into(), ..Default::default() };
        let req = expand_create(&spec).unwrap();
        assert_eq!(req.size_mb, 20 * 1024);
        assert_eq!(req.plan, DiskPlan::Ssd);
    }

    #[test]
    fn round_trips_persisted_fields() {
        let spec = DiskSpec {
            name: "data-01".into(),
            description: FieldValue::Value("scratch".into()),
            plan: FieldValue::Value(DiskPlan::Hdd),
            size_gb: FieldValue::Value(100),
            source_archive_id: FieldValue::Value(ResourceId::new("arc-1")),
            ..Default::default()
        };
        let doc = flatten(&apply_create(&expand_create(&spec).unwrap()), Some(&spec));
        assert_eq!(doc.name, spec.name);
        assert_eq!(doc.description, spec.description);
        assert_eq!(doc.plan, spec.plan);
        assert_eq!(doc.size_gb, spec.size_gb);
        assert_eq!(doc.source_archive_id, spec.source_archive_id);
    }

    #[test]
    fn placement_hint_carries_from_prior() {
        let mut spec = DiskSpec { name: "data-01".into(), ..Default::default() };
        spec.distant_from.insert(ResourceId::new("disk-8"));

        let api = apply_create(&expand_create(&spec).unwrap());
        let doc = flatten(&api, Some(&spec));
        assert_eq!(doc.distant_from, spec.distant_from);

        // Without prior state there is nothing to carry.
        assert!(flatten(&api, None).distant_from.is_empty());
    }
}
