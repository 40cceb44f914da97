// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The VPN router desired document and its change classifier.
//!
//! The router carries the largest settings surface in the catalogue: NAT,
//! port forwarding, firewall rules, DHCP, L2TP/IPsec, WireGuard, remote
//! access users, and static routes. All of it applies with a config reload,
//! so settings changes grade as live. What does not apply live is topology:
//! attaching or moving interfaces needs the router down, and the plan or
//! software version can only change by building a new router.

pub mod convert;
pub mod driver;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use cumulus_api_types::{
    vpn_router::{
        DhcpServer, FirewallRule, L2tpServer, PortForwarding, RemoteAccessUser,
        RouterPlan, StaticNat, StaticRoute, WireGuardServer,
    },
    ResourceId,
};

use crate::classify::{ChangeRecord, Severity};
use crate::value::FieldValue;

/// The public (index 0) side of a premium-plan router. Standard-plan routers
/// sit on the shared segment and have no public interface configuration.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PublicInterfaceSpec {
    pub switch_id: ResourceId,
    pub ip_addresses: Vec<String>,
    pub virtual_ip_address: FieldValue<String>,
    pub ip_aliases: Vec<String>,
    pub vrid: u32,
}

/// One private interface. `index` is the server-assigned slot (1..=7) and is
/// what correlates attachment with IP configuration; list position carries
/// no meaning.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PrivateInterfaceSpec {
    pub index: u8,
    pub switch_id: ResourceId,
    pub ip_addresses: Vec<String>,
    pub netmask_len: u8,
    pub virtual_ip_address: FieldValue<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct VpnRouterSpec {
    pub id: FieldValue<ResourceId>,
    pub name: String,
    pub description: FieldValue<String>,
    pub tags: BTreeSet<String>,
    pub plan: RouterPlan,
    pub version: FieldValue<u32>,
    pub public_interface: FieldValue<PublicInterfaceSpec>,
    pub private_interfaces: Vec<PrivateInterfaceSpec>,
    pub internet_connection: FieldValue<bool>,
    pub static_nat: Vec<StaticNat>,
    pub port_forwarding: Vec<PortForwarding>,
    pub firewall: Vec<FirewallRule>,
    pub dhcp_servers: Vec<DhcpServer>,
    pub l2tp: FieldValue<L2tpServer>,
    pub wire_guard: FieldValue<WireGuardServer>,
    pub users: Vec<RemoteAccessUser>,
    pub static_routes: Vec<StaticRoute>,
    pub syslog_host: FieldValue<String>,
    pub force_shutdown: bool,
}

pub fn classify(prior: Option<&VpnRouterSpec>, new: &VpnRouterSpec) -> ChangeRecord {
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

    record.compare(
        "internet_connection",
        Severity::LiveUpdatable,
        &prior.internet_connection,
        &new.internet_connection,
    );
    record.compare(
        "static_nat",
        Severity::LiveUpdatable,
        &prior.static_nat,
        &new.static_nat,
    );
    record.compare(
        "port_forwarding",
        Severity::LiveUpdatable,
        &prior.port_forwarding,
        &new.port_forwarding,
    );
    record.compare("firewall", Severity::LiveUpdatable, &prior.firewall, &new.firewall);
    record.compare(
        "dhcp_servers",
        Severity::LiveUpdatable,
        &prior.dhcp_servers,
        &new.dhcp_servers,
    );
    record.compare("l2tp", Severity::LiveUpdatable, &prior.l2tp, &new.l2tp);
    record.compare(
        "wire_guard",
        Severity::LiveUpdatable,
        &prior.wire_guard,
        &new.wire_guard,
    );
    record.compare("user", Severity::LiveUpdatable, &prior.users, &new.users);
    record.compare(
        "static_routes",
        Severity::LiveUpdatable,
        &prior.static_routes,
        &new.static_routes,
    );
    record.compare(
        "syslog_host",
        Severity::LiveUpdatable,
        &prior.syslog_host,
        &new.syslog_host,
    );

    // Interface comparisons watch topology only: which slot is attached to
    // which switch. Rewiring needs the router down, but address and VIP
    // edits travel in the settings document and apply live.
    let prior_public_switch = prior.public_interface.as_value().map(|p| &p.switch_id);
    let new_public_switch = new.public_interface.as_value().map(|p| &p.switch_id);
    if prior_public_switch != new_public_switch {
        record.push("public_network_interface", Severity::RequiresDisruption);
    } else if prior.public_interface != new.public_interface {
        record.push("public_network_interface", Severity::LiveUpdatable);
    }

    if private_topology(&prior.private_interfaces)
        != private_topology(&new.private_interfaces)
    {
        record.push("private_network_interface", Severity::RequiresDisruption);
    } else if prior.private_interfaces != new.private_interfaces {
        record.push("private_network_interface", Severity::LiveUpdatable);
    }

    record.compare("plan", Severity::RequiresRecreation, &prior.plan, &new.plan);
    if let Some(version) = new.version.as_value() {
        if prior.version.as_value() != Some(version) {
            record.push("version", Severity::RequiresRecreation);
        }
    }

    record
}

/// The watched attachment set: slot index to switch, sorted by slot.
fn private_topology(interfaces: &[PrivateInterfaceSpec]) -> Vec<(u8, &ResourceId)> {
    let mut topology: Vec<_> =
        interfaces.iter().map(|i| (i.index, &i.switch_id)).collect();
    topology.sort();
    topology
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_spec() -> VpnRouterSpec {
        VpnRouterSpec {
            id: FieldValue::Value(ResourceId::new("vr-1")),
            name: "edge-01".to_string(),
            plan: RouterPlan::Standard,
            version: FieldValue::Value(2),
            private_interfaces: vec![PrivateInterfaceSpec {
                index: 1,
                switch_id: ResourceId::new("sw-1"),
                ip_addresses: vec!["192.168.11.1".to_string()],
                netmask_len: 24,
                virtual_ip_address: FieldValue::Null,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn no_prior_state_always_requires_disruption() {
        assert!(classify(None, &base_spec()).requires_disruption());
    }

    #[test]
    fn firewall_edit_is_live() {
        use cumulus_api_types::vpn_router::{Direction, FirewallProtocol};

        let prior = base_spec();
        let mut new = base_spec();
        new.firewall.push(FirewallRule {
            interface_index: 1,
            direction: Direction::Receive,
            protocol: FirewallProtocol::Tcp,
            source_network: String::new(),
            source_port: String::new(),
            destination_network: String::new(),
            destination_port: "22".to_string(),
            allow: false,
            logging: true,
            description: String::new(),
        });

        let record = classify(Some(&prior), &new);
        assert_eq!(record.severity(), Some(Severity::LiveUpdatable));
    }

    #[test]
    fn interface_move_requires_disruption() {
        let prior = base_spec();
        let mut new = base_spec();
        new.private_interfaces[0].switch_id = ResourceId::new("sw-2");

        assert!(classify(Some(&prior), &new).requires_disruption());
    }

    #[test]
    fn interface_address_edit_is_live() {
        let prior = base_spec();
        let mut new = base_spec();
        new.private_interfaces[0].ip_addresses = vec!["192.168.11.2".to_string()];

        let record = classify(Some(&prior), &new);
        assert_eq!(record.severity(), Some(Severity::LiveUpdatable));
    }

    #[test]
    fn plan_change_requires_recreation() {
        let prior = base_spec();
        let mut new = base_spec();
        new.plan = RouterPlan::Premium;

        assert!(classify(Some(&prior), &new).requires_recreation());
    }

    #[test]
    fn unconfigured_version_does_not_recreate() {
        let prior = base_spec();
        let mut new = base_spec();
        new.version = FieldValue::Default;

        assert!(classify(Some(&prior), &new).is_converged());
    }
}
