// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The server desired document and its change classifier.
//!
//! A server is a compound of the machine body (cpu/memory/commitment), an
//! unordered set of attached disks, and an ordered list of network
//! interfaces whose first entry is the primary NIC. Which fields can change
//! live and which demand a stop comes from how the hypervisor applies them:
//! plan-level knobs resize live, but rewiring an upstream or swapping the
//! paravirtual driver means the guest must be down.

pub mod convert;
pub mod driver;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use cumulus_api_types::{
    server::{Commitment, InterfaceDriver},
    ResourceId,
};

use crate::classify::{ChangeRecord, Severity};
use crate::value::FieldValue;

/// What a NIC is wired to. Matched exhaustively by both the expander and the
/// flattener.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Upstream {
    /// The provider-operated shared segment.
    Shared,
    /// Present but unplugged.
    Disconnect,
    /// A user switch.
    Switch { switch_id: ResourceId },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NicSpec {
    pub upstream: Upstream,
    /// Display-only; recorded alongside the NIC but never configured into
    /// it, so changing it is cosmetic.
    pub user_ip_address: FieldValue<String>,
    pub packet_filter_id: FieldValue<ResourceId>,
    /// Assigned by the control plane.
    pub mac_address: FieldValue<String>,
}

impl NicSpec {
    pub fn new(upstream: Upstream) -> Self {
        Self {
            upstream,
            user_ip_address: FieldValue::Default,
            packet_filter_id: FieldValue::Default,
            mac_address: FieldValue::Unknown,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ServerSpec {
    pub id: FieldValue<ResourceId>,
    pub name: String,
    pub description: FieldValue<String>,
    pub tags: BTreeSet<String>,
    pub core: FieldValue<u32>,
    pub memory_gb: FieldValue<u32>,
    pub gpu: FieldValue<u32>,
    pub cpu_model: FieldValue<String>,
    pub commitment: FieldValue<Commitment>,
    pub interface_driver: FieldValue<InterfaceDriver>,
    pub disks: BTreeSet<ResourceId>,
    pub network_interfaces: Vec<NicSpec>,
    pub cdrom_id: FieldValue<ResourceId>,
    pub private_host_id: FieldValue<ResourceId>,
    pub private_host_name: FieldValue<String>,
    /// Cut power instead of signaling the guest when a stop is needed.
    /// Local to the document; the control plane never sees or echoes it.
    pub force_shutdown: bool,

    // Filled from canonical state on read-back.
    pub ip_address: FieldValue<String>,
    pub gateway: FieldValue<String>,
    pub network_address: FieldValue<String>,
    pub netmask: FieldValue<u8>,
    pub hostname: FieldValue<String>,
    pub dns_servers: FieldValue<Vec<String>>,
}

/// Compares a prior document against a new one and grades every difference.
///
/// With no prior document there is nothing to prove a live apply safe
/// against, so the record demands disruption unconditionally.
pub fn classify(prior: Option<&ServerSpec>, new: &ServerSpec) -> ChangeRecord {
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
    record.compare("core", Severity::LiveUpdatable, &prior.core, &new.core);
    record.compare(
        "memory_gb",
        Severity::LiveUpdatable,
        &prior.memory_gb,
        &new.memory_gb,
    );
    record.compare("gpu", Severity::LiveUpdatable, &prior.gpu, &new.gpu);
    record.compare(
        "commitment",
        Severity::LiveUpdatable,
        &prior.commitment,
        &new.commitment,
    );
    record.compare(
        "cdrom_id",
        Severity::LiveUpdatable,
        &prior.cdrom_id,
        &new.cdrom_id,
    );

    // cpu_model falls back to the prior value when the new document leaves
    // it to be computed, so only an explicit value can introduce a diff.
    if let Some(model) = new.cpu_model.as_value() {
        if prior.cpu_model.as_value() != Some(model) {
            record.push("cpu_model", Severity::RequiresDisruption);
        }
    }

    record.compare(
        "interface_driver",
        Severity::RequiresDisruption,
        &prior.interface_driver,
        &new.interface_driver,
    );
    record.compare("disks", Severity::RequiresDisruption, &prior.disks, &new.disks);
    record.compare(
        "private_host_id",
        Severity::RequiresDisruption,
        &prior.private_host_id,
        &new.private_host_id,
    );

    if upstream_changed(&prior.network_interfaces, &new.network_interfaces) {
        record.push("network_interface.upstream", Severity::RequiresDisruption);
    } else {
        // Same topology; packet filter assignments swap live. The display
        // address is cosmetic and never counts as a change.
        for (p, n) in prior.network_interfaces.iter().zip(&new.network_interfaces) {
            if p.packet_filter_id != n.packet_filter_id {
                record.push(
                    "network_interface.packet_filter_id",
                    Severity::LiveUpdatable,
                );
                break;
            }
        }
    }

    record
}

/// Whether the interface list changed in a way the guest can observe: a
/// different NIC count or any NIC rewired to a different upstream.
fn upstream_changed(prior: &[NicSpec], new: &[NicSpec]) -> bool {
    if prior.len() != new.len() {
        return true;
    }
    prior.iter().zip(new).any(|(p, n)| p.upstream != n.upstream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_spec() -> ServerSpec {
        ServerSpec {
            id: FieldValue::Value(ResourceId::new("srv-1")),
            name: "web-01".to_string(),
            core: FieldValue::Value(2),
            memory_gb: FieldValue::Value(4),
            network_interfaces: vec![NicSpec::new(Upstream::Shared)],
            ..Default::default()
        }
    }

    #[test]
    fn no_prior_state_always_requires_disruption() {
        let record = classify(None, &base_spec());
        assert!(record.requires_disruption());
    }

    #[test]
    fn memory_resize_is_live_updatable() {
        let prior = base_spec();
        let mut new = base_spec();
        new.memory_gb = FieldValue::Value(8);

        let record = classify(Some(&prior), &new);
        assert_eq!(record.severity(), Some(Severity::LiveUpdatable));
        assert!(!record.requires_disruption());
    }

    #[test]
    fn upstream_rewire_requires_disruption() {
        let prior = base_spec();
        let mut new = base_spec();
        new.network_interfaces = vec![NicSpec::new(Upstream::Disconnect)];

        let record = classify(Some(&prior), &new);
        assert!(record.requires_disruption());
        assert!(record
            .diffs()
            .iter()
            .any(|d| d.field == "network_interface.upstream"));
    }

    #[test]
    fn adding_a_nic_requires_disruption() {
        let prior = base_spec();
        let mut new = base_spec();
        new.network_interfaces.push(NicSpec::new(Upstream::Switch {
            switch_id: ResourceId::new("sw-1"),
        }));

        assert!(classify(Some(&prior), &new).requires_disruption());
    }

    #[test]
    fn display_address_is_cosmetic() {
        let prior = base_spec();
        let mut new = base_spec();
        new.network_interfaces[0].user_ip_address =
            FieldValue::Value("192.0.2.10".to_string());

        assert!(classify(Some(&prior), &new).is_converged());
    }

    #[test]
    fn packet_filter_swap_is_live() {
        let prior = base_spec();
        let mut new = base_spec();
        new.network_interfaces[0].packet_filter_id =
            FieldValue::Value(ResourceId::new("pf-1"));

        let record = classify(Some(&prior), &new);
        assert_eq!(record.severity(), Some(Severity::LiveUpdatable));
    }

    #[test]
    fn disk_membership_change_requires_disruption() {
        let prior = base_spec();
        let mut new = base_spec();
        new.disks.insert(ResourceId::new("disk-9"));

        assert!(classify(Some(&prior), &new).requires_disruption());
    }

    #[test]
    fn unknown_cpu_model_uses_prior_value() {
        let mut prior = base_spec();
        prior.cpu_model = FieldValue::Value("amd_epyc_7713p".to_string());
        let mut new = base_spec();
        new.cpu_model = FieldValue::Unknown;

        assert!(classify(Some(&prior), &new).is_converged());
    }
}
